pub mod error;
pub mod openai;
pub mod util;

pub use error::{AiError, Result};
pub use openai::{OpenAi, StructuredOutput};
pub use util::{strip_code_blocks, strip_wrapping_quotes, truncate_to_char_boundary};
