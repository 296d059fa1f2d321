pub mod default_charset;
pub mod metadata_type;
pub mod table_descriptor;
pub mod table_map_decoder;

pub use table_descriptor::TableDescriptor;
pub use table_map_decoder::decode_table_map;
