//! Target abstraction layer for the ugbc compiler core: a self-contained
//! model of "the machine" the emitter targets, built as a `match`-dispatched
//! set of primitive verbs rather than a binary instruction encoder, since
//! the compiler core emits assembly text, not machine words.

pub mod datatype;
pub mod deployable;
pub mod reference;
pub mod registry;
pub mod screen;
pub mod verb;

pub use datatype::DataType;
pub use deployable::Deployable;
pub use screen::ScreenMode;
pub use verb::{AluOp, CompareOp, Target, Width};
