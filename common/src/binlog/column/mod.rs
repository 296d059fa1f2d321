pub mod column_type;
