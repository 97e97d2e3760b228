//! Command Module
//!
//! Maps each request onto the record store:
//!
//! | Command  | Store call     | Success      | Failure           |
//! |----------|----------------|--------------|-------------------|
//! | `INIT`   | `create`       | `USERCODE h` | -                 |
//! | `PUT`    | `update`       | `OK`         | `FAILED`          |
//! | `GET`    | `read_field`   | value        | empty string      |
//! | `DELETE` | `delete`       | `DELETED`    | `NOT_FOUND`       |
//! | `GETALL` | `dump_all`     | lines, `END` | `AUTH_FAILED`     |
//! | other    | -              | -            | `UNKNOWN_COMMAND` |

pub mod handler;

// Re-export the main command handler
pub use handler::CommandHandler;
