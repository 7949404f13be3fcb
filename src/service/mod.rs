pub mod agent;
pub mod availability;
pub mod calendar_service;
pub mod chat_client;
pub mod openai_service;
pub mod session_store;
pub mod tools;
