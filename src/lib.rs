//! bibenrich: fill in missing bibliographic metadata with an LLM.
//!
//! Two flows share one pipeline shape:
//! - abstracts: records with an empty abstract and a PDF attachment get an
//!   abstract written from the attachment's extracted text
//! - tagging: records get subject tags classified from title and abstract
//!   against a fixed vocabulary
//!
//! See `DESIGN.md` for how the pieces fit together.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod decode;
pub mod gate;
pub mod library;
pub mod logging;
pub mod outcome;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod vocabulary;
