//! Concrete provider implementations.

pub mod stackoverflow;

pub use stackoverflow::{
    question_id_from_url, QuestionDetail, StackExchangeApi, StackOverflowProvider,
};
