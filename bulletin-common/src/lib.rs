pub mod model;
pub mod object_id;
