pub mod catalog;
pub mod chat_job;
pub mod chat_request;
pub mod chat_response;
