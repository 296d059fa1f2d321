use common::binlog::column::column_type::{ColumnType, Flavor};
use crate::metadata::default_charset::DefaultCharset;
use crate::utils::bit_msb_first;

/// Per-table schema snapshot produced by the Table Map Decoder and consumed by
/// the Rows Decoder. One instance is created per TABLE_MAP event and retained
/// in a `table_id -> TableDescriptor` mapping (see [`crate::row::TableMap`])
/// owned by the surrounding stream reader; this type itself holds no
/// reference to that mapping.
///
/// <a href="https://dev.mysql.com/doc/dev/mysql-server/latest/classbinary__log_1_1Table__map__event.html">See more</a>
#[derive(Clone, Debug)]
pub struct TableDescriptor {
    pub flavor: Flavor,
    pub table_id_size: u8,
    pub table_id: u64,
    pub flags: u16,
    pub schema: Vec<u8>,
    pub table: Vec<u8>,

    /// One type byte per column.
    pub column_type: Vec<u8>,
    /// One 16-bit meta value per column, packed per the rules in §4.1.
    pub column_meta: Vec<u16>,
    /// `ceil(column_count / 8)` bytes, bit i set => column i is nullable.
    pub null_bitmap: Vec<u8>,

    /// Raw bitmap, MSB-first, indexed across numeric columns only.
    pub signedness_bitmap: Option<Vec<u8>>,
    pub default_charset: Option<DefaultCharset>,
    /// One charset collation id per character column, in column order.
    pub column_charset: Option<Vec<u32>>,
    pub enum_set_default_charset: Option<DefaultCharset>,
    pub enum_set_column_charset: Option<Vec<u32>>,
    /// Outer sequence one per SET column (in column order); inner sequence of labels.
    pub set_str_values: Option<Vec<Vec<String>>>,
    /// Outer sequence one per ENUM column (in column order); inner sequence of labels.
    pub enum_str_values: Option<Vec<Vec<String>>>,
    pub column_names: Option<Vec<String>>,
    /// Parallel to `primary_key_prefix`; column indices making up the primary key.
    pub primary_key: Option<Vec<u32>>,
    /// Prefix length per primary key column; 0 means "full column".
    pub primary_key_prefix: Option<Vec<u32>>,
    /// One subtype per GEOMETRY column, in column order.
    pub geometry_types: Option<Vec<u32>>,
    /// Raw bitmap, MSB-first, indexed across all columns; bit set = visible.
    pub visibility_bitmap: Option<Vec<u8>>,
}

impl TableDescriptor {
    pub fn column_count(&self) -> usize {
        self.column_type.len()
    }

    pub fn is_nullable(&self, column_index: usize) -> bool {
        crate::utils::bit_lsb_first(&self.null_bitmap, column_index)
    }

    /// `true` iff the numeric column at `numeric_index` (its position among
    /// numeric columns only, not the full column index) is declared UNSIGNED.
    pub fn is_unsigned(&self, numeric_index: usize) -> bool {
        match &self.signedness_bitmap {
            Some(bitmap) => bit_msb_first(bitmap, numeric_index),
            None => false,
        }
    }

    pub fn is_visible(&self, column_index: usize) -> bool {
        match &self.visibility_bitmap {
            // Absent VISIBILITY metadata means every column predates the
            // feature and is therefore visible.
            None => true,
            Some(bitmap) => bit_msb_first(bitmap, column_index),
        }
    }

    /// The real column type after applying the STRING real-type rewrite rule
    /// from §4.3: STRING columns whose meta high byte names ENUM/SET or DATE
    /// columns (stored internally as NEWDATE) report their real type here.
    pub fn real_type(&self, column_index: usize) -> Option<ColumnType> {
        let stored = ColumnType::try_from(self.column_type[column_index]).ok()?;
        let meta = self.column_meta[column_index];
        match stored {
            ColumnType::String if meta >= 256 => {
                let hi = (meta >> 8) as u8;
                ColumnType::try_from(hi).ok()
            }
            ColumnType::Date => Some(ColumnType::NewDate),
            other => Some(other),
        }
    }

    /// Full-column indices of every charset-bearing (character) column, in
    /// column order. This is the index space that `column_charset` and
    /// `default_charset`'s per-column overrides are keyed against.
    pub fn character_column_indices(&self) -> Vec<usize> {
        self.column_type
            .iter()
            .enumerate()
            .filter_map(|(i, &t)| {
                let kind = ColumnType::try_from(t).ok()?;
                kind.is_character(self.flavor).then_some(i)
            })
            .collect()
    }

    /// Full-column indices of every ENUM or SET column, in column order.
    /// This is the index space `enum_str_values`/`set_str_values` and the
    /// EnumAndSet charset metadata are keyed against.
    pub fn enum_set_column_indices(&self) -> Vec<usize> {
        (0..self.column_count())
            .filter(|&i| matches!(self.real_type(i), Some(ColumnType::Enum) | Some(ColumnType::Set)))
            .collect()
    }

    /// Charset collation id declared for a character column, if COLUMN_CHARSET
    /// or DEFAULT_CHARSET metadata was present in the Table Map event.
    pub fn charset_for_column(&self, column_index: usize) -> Option<u32> {
        let position = self.character_column_indices().iter().position(|&i| i == column_index)?;
        if let Some(charsets) = &self.column_charset {
            return charsets.get(position).copied();
        }
        let default = self.default_charset.as_ref()?;
        if let Some(&(_, collation)) = default.charset_collations.iter().find(|&&(idx, _)| idx as usize == position) {
            return Some(collation);
        }
        Some(default.default_charset_collation)
    }

    /// String labels for the ENUM column at `column_index`, if ENUM_STR_VALUE
    /// metadata was present.
    pub fn enum_values_for_column(&self, column_index: usize) -> Option<&Vec<String>> {
        if !matches!(self.real_type(column_index), Some(ColumnType::Enum)) {
            return None;
        }
        let position = self.enum_set_column_indices().iter().position(|&i| i == column_index)?;
        self.enum_str_values.as_ref()?.get(position)
    }

    /// String labels for the SET column at `column_index`, if SET_STR_VALUE
    /// metadata was present.
    pub fn set_values_for_column(&self, column_index: usize) -> Option<&Vec<String>> {
        if !matches!(self.real_type(column_index), Some(ColumnType::Set)) {
            return None;
        }
        let position = self.enum_set_column_indices().iter().position(|&i| i == column_index)?;
        self.set_str_values.as_ref()?.get(position)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn minimal_descriptor() -> TableDescriptor {
        TableDescriptor {
            flavor: Flavor::Mysql,
            table_id_size: 6,
            table_id: 1,
            flags: 0,
            schema: b"db".to_vec(),
            table: b"t".to_vec(),
            column_type: vec![ColumnType::Tiny as u8],
            column_meta: vec![0],
            null_bitmap: vec![0b0000_0000],
            signedness_bitmap: None,
            default_charset: None,
            column_charset: None,
            enum_set_default_charset: None,
            enum_set_column_charset: None,
            set_str_values: None,
            enum_str_values: None,
            column_names: None,
            primary_key: None,
            primary_key_prefix: None,
            geometry_types: None,
            visibility_bitmap: None,
        }
    }

    #[test]
    fn absent_visibility_metadata_means_visible() {
        let d = minimal_descriptor();
        assert!(d.is_visible(0));
    }

    #[test]
    fn absent_signedness_metadata_means_signed() {
        let d = minimal_descriptor();
        assert!(!d.is_unsigned(0));
    }

    #[test]
    fn charset_for_column_falls_back_to_default_collation() {
        let mut d = minimal_descriptor();
        d.column_type = vec![ColumnType::VarChar as u8];
        d.column_meta = vec![10];
        d.default_charset = Some(DefaultCharset::new(33, vec![]));
        assert_eq!(d.charset_for_column(0), Some(33));
    }

    #[test]
    fn charset_for_column_honors_per_column_override() {
        let mut d = minimal_descriptor();
        d.column_type = vec![ColumnType::VarChar as u8];
        d.column_meta = vec![10];
        d.default_charset = Some(DefaultCharset::new(33, vec![(0, 45)]));
        assert_eq!(d.charset_for_column(0), Some(45));
    }

    #[test]
    fn enum_values_for_column_looks_up_by_enum_set_position() {
        let mut d = minimal_descriptor();
        d.column_type = vec![ColumnType::Tiny as u8, ColumnType::String as u8];
        d.column_meta = vec![0, ((ColumnType::Enum as u16) << 8) | 1];
        d.enum_str_values = Some(vec![vec!["a".to_string(), "b".to_string()]]);
        assert_eq!(d.enum_values_for_column(1), Some(&vec!["a".to_string(), "b".to_string()]));
        assert_eq!(d.enum_values_for_column(0), None);
    }
}
