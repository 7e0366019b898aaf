mod dispatcher;
mod email;
mod engine;

pub use dispatcher::AlertDispatcher;
pub use email::{EmailConfig, EmailError, Mailer};
pub use engine::{AlertEngine, AlertIntent, CooldownPolicy};
