// Wed Jan 14 2026 - Alex

pub mod router;
pub mod tokenizer;

pub use router::{KeyRouter, Routed};
pub use tokenizer::{is_token_byte, Token, Tokenizer, Tokens};
