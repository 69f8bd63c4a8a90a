pub mod actor;
pub mod change_record;
pub mod change_set;
pub mod field_meta;
