pub mod console_notifier;
pub mod http_client;
pub mod in_memory;
