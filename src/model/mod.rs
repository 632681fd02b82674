pub mod annotation;
pub mod centre;
pub mod collection_event;
pub mod collection_event_type;
pub mod common;
pub mod entity;
pub mod entity_info;
pub mod entity_name;
pub mod location;
pub mod paged;
pub mod participant;
pub mod schema;
pub mod specimen_description;
pub mod specimen_group;
pub mod state;
pub mod study;

pub use annotation::*;
pub use centre::*;
pub use collection_event::*;
pub use collection_event_type::*;
pub use common::*;
pub use entity::*;
pub use entity_info::*;
pub use entity_name::*;
pub use location::*;
pub use paged::*;
pub use participant::*;
pub use schema::*;
pub use specimen_description::*;
pub use specimen_group::*;
pub use state::*;
pub use study::*;
