pub mod board;
pub mod field;
pub mod hours;
pub mod issue;
pub mod issue_type;
pub mod priority;
pub mod project;
pub mod record;
pub mod search;
pub mod sprint;
pub mod status;
pub mod user;

pub use board::*;
pub use field::*;
pub use hours::*;
pub use issue::*;
pub use issue_type::*;
pub use priority::*;
pub use project::*;
pub use record::*;
pub use search::*;
pub use sprint::*;
pub use status::*;
pub use user::*;
