use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;

/// MYSQL 数据类型
///
/// <table>
///   <caption>Table_map_event column types: numerical identifier and
///   metadata</caption>
///   <tr>
///     <th>Name</th>
///     <th>Identifier</th>
///     <th>Size of metadata in bytes</th>
///     <th>Description of metadata</th>
///   </tr>
///
///   <tr><td>MYSQL_TYPE_DECIMAL</td><td>0</td><td>0</td><td>No column metadata.</td></tr>
///   <tr><td>MYSQL_TYPE_TINY</td><td>1</td><td>0</td><td>No column metadata.</td></tr>
///   <tr><td>MYSQL_TYPE_SHORT</td><td>2</td><td>0</td><td>No column metadata.</td></tr>
///   <tr><td>MYSQL_TYPE_LONG</td><td>3</td><td>0</td><td>No column metadata.</td></tr>
///
///   <tr>
///     <td>MYSQL_TYPE_FLOAT</td><td>4</td>
///     <td>1 byte</td>
///     <td>1 byte unsigned integer, representing the "pack_length", which
///     is equal to sizeof(float) on the server from which the event
///     originates.</td>
///   </tr>
///
///   <tr>
///     <td>MYSQL_TYPE_DOUBLE</td><td>5</td>
///     <td>1 byte</td>
///     <td>1 byte unsigned integer, representing the "pack_length", which
///     is equal to sizeof(double) on the server from which the event
///     originates.</td>
///   </tr>
///
///   <tr><td>MYSQL_TYPE_NULL</td><td>6</td><td>0</td><td>No column metadata.</td></tr>
///   <tr><td>MYSQL_TYPE_TIMESTAMP</td><td>7</td><td>0</td><td>No column metadata.</td></tr>
///   <tr><td>MYSQL_TYPE_LONGLONG</td><td>8</td><td>0</td><td>No column metadata.</td></tr>
///   <tr><td>MYSQL_TYPE_INT24</td><td>9</td><td>0</td><td>No column metadata.</td></tr>
///   <tr><td>MYSQL_TYPE_DATE</td><td>10</td><td>0</td><td>No column metadata.</td></tr>
///   <tr><td>MYSQL_TYPE_TIME</td><td>11</td><td>0</td><td>No column metadata.</td></tr>
///   <tr><td>MYSQL_TYPE_DATETIME</td><td>12</td><td>0</td><td>No column metadata.</td></tr>
///   <tr><td>MYSQL_TYPE_YEAR</td><td>13</td><td>0</td><td>No column metadata.</td></tr>
///
///   <tr>
///     <td><i>MYSQL_TYPE_NEWDATE</i></td><td><i>14</i></td>
///     <td>&ndash;</td>
///     <td><i>This enumeration value is only used internally and cannot
///     exist in a binlog.</i></td>
///   </tr>
///
///   <tr>
///     <td>MYSQL_TYPE_VARCHAR</td><td>15</td>
///     <td>2 bytes</td>
///     <td>2 byte unsigned integer representing the maximum length of
///     the string.</td>
///   </tr>
///
///   <tr>
///     <td>MYSQL_TYPE_BIT</td><td>16</td>
///     <td>2 bytes</td>
///     <td>A 1 byte unsigned int representing the length in bits of the
///     bitfield (0 to 64), followed by a 1 byte unsigned int
///     representing the number of bytes occupied by the bitfield.  The
///     number of bytes is either int((length + 7) / 8) or int(length / 8).
///     </td>
///   </tr>
///
///   <tr>
///     <td>MYSQL_TYPE_TIMESTAMP2</td><td>17</td>
///     <td>1 byte</td>
///     <td>fractional second precision, 0-6</td>
///   </tr>
///   <tr>
///     <td>MYSQL_TYPE_DATETIME2</td><td>18</td>
///     <td>1 byte</td>
///     <td>fractional second precision, 0-6</td>
///   </tr>
///   <tr>
///     <td>MYSQL_TYPE_TIME2</td><td>19</td>
///     <td>1 byte</td>
///     <td>fractional second precision, 0-6</td>
///   </tr>
///
///   <tr>
///     <td>MYSQL_TYPE_NEWDECIMAL</td><td>246</td>
///     <td>2 bytes</td>
///     <td>A 1 byte unsigned int representing the precision, followed
///     by a 1 byte unsigned int representing the number of decimals.</td>
///   </tr>
///
///   <tr>
///     <td><i>MYSQL_TYPE_ENUM</i></td><td><i>247</i></td>
///     <td>&ndash;</td>
///     <td><i>Only reaches us as MYSQL_TYPE_STRING with a real-type override.</i></td>
///   </tr>
///   <tr>
///     <td><i>MYSQL_TYPE_SET</i></td><td><i>248</i></td>
///     <td>&ndash;</td>
///     <td><i>Only reaches us as MYSQL_TYPE_STRING with a real-type override.</i></td>
///   </tr>
///
///   <tr>
///     <td>MYSQL_TYPE_BLOB</td><td>252</td>
///     <td>1 byte</td>
///     <td>The pack length, i.e., the number of bytes needed to represent
///     the length of the blob: 1, 2, 3, or 4.</td>
///   </tr>
///
///   <tr>
///     <td>MYSQL_TYPE_VAR_STRING</td><td>253</td>
///     <td>2 bytes</td>
///     <td>This is used to store both strings and enumeration values.
///     The first byte is a enumeration value storing the <i>real
///     type</i>, which may be either MYSQL_TYPE_VAR_STRING or
///     MYSQL_TYPE_ENUM.  The second byte is a 1 byte unsigned integer
///     representing the field size, i.e., the number of bytes needed to
///     store the length of the string.</td>
///   </tr>
///
///   <tr>
///     <td>MYSQL_TYPE_STRING</td><td>254</td>
///     <td>2 bytes</td>
///     <td>The first byte is always MYSQL_TYPE_VAR_STRING (i.e., 253).
///     The second byte is the field size, i.e., the number of bytes in
///     the representation of size of the string: 3 or 4.</td>
///   </tr>
///
///   <tr>
///     <td>MYSQL_TYPE_GEOMETRY</td><td>255</td>
///     <td>1 byte</td>
///     <td>The pack length, i.e., the number of bytes needed to represent
///     the length of the geometry: 1, 2, 3, or 4.</td>
///   </tr>
///   </table>
///
/// type def ref: https://dev.mysql.com/doc/dev/mysql-server/latest/rows__event_8h_source.html
#[derive(Debug, Serialize, PartialEq, Eq, Hash, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ColumnType {
    Decimal = 0,
    Tiny = 1,
    Short = 2,
    Long = 3,
    Float = 4,
    Double = 5,
    Null = 6,
    Timestamp = 7,
    LongLong = 8,
    Int24 = 9,
    Date = 10,
    Time = 11,
    DateTime = 12,
    Year = 13,
    NewDate = 14, // internal use only, never appears on the wire directly
    VarChar = 15,
    Bit = 16,
    Timestamp2 = 17,
    DateTime2 = 18,
    Time2 = 19,

    /// MySQL 9.0's VECTOR column, introduced for built-in vector search.
    /// Decodes identically to BLOB/GEOMETRY: a `meta`-byte length prefix.
    Vector = 242,

    Json = 245,
    NewDecimal = 246,
    Enum = 247,     // internal use only; reaches us as STRING + real-type override
    Set = 248,      // internal use only; reaches us as STRING + real-type override
    TinyBlob = 249, // internal use only; reaches us as BLOB
    MediumBlob = 250,
    LongBlob = 251,
    Blob = 252,
    VarString = 253,
    String = 254,
    Geometry = 255,
}

/// Distinguishes MySQL-only semantics (here: whether GEOMETRY is charset-bearing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    Mysql,
    MariaDb,
}

impl ColumnType {
    /// Number of metadata bytes this type consumes in a Table Map's metadata block,
    /// per the per-type table in the MySQL/MariaDB binlog documentation.
    pub fn meta_bytes(&self) -> u8 {
        match *self {
            ColumnType::Float
            | ColumnType::Double
            | ColumnType::Blob
            | ColumnType::Geometry
            | ColumnType::Vector
            | ColumnType::Json
            | ColumnType::Timestamp2
            | ColumnType::DateTime2
            | ColumnType::Time2 => 1,
            ColumnType::VarChar | ColumnType::Bit | ColumnType::NewDecimal | ColumnType::String | ColumnType::VarString => 2,
            _ => 0,
        }
    }

    /// Whether this type carries a charset and is counted by DEFAULT_CHARSET /
    /// COLUMN_CHARSET's "character column" index space (as opposed to the ENUM/SET
    /// charset TLVs, or no charset at all). GEOMETRY is character-bearing only
    /// under the MariaDB flavor.
    pub fn is_character(&self, flavor: Flavor) -> bool {
        match *self {
            ColumnType::VarChar
            | ColumnType::VarString
            | ColumnType::String
            | ColumnType::Blob
            | ColumnType::TinyBlob
            | ColumnType::MediumBlob
            | ColumnType::LongBlob => true,
            ColumnType::Geometry => flavor == Flavor::MariaDb,
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_through_u8() {
        let code = ColumnType::LongBlob;
        assert_eq!(251, u8::from(code));

        let t = ColumnType::try_from(253).unwrap();
        assert_eq!(t, ColumnType::VarString);
    }

    #[test]
    fn meta_bytes_matches_spec_table() {
        assert_eq!(ColumnType::Long.meta_bytes(), 0);
        assert_eq!(ColumnType::Float.meta_bytes(), 1);
        assert_eq!(ColumnType::VarChar.meta_bytes(), 2);
        assert_eq!(ColumnType::NewDecimal.meta_bytes(), 2);
    }

    #[test]
    fn geometry_is_character_only_for_mariadb() {
        assert!(ColumnType::Geometry.is_character(Flavor::MariaDb));
        assert!(!ColumnType::Geometry.is_character(Flavor::Mysql));
        assert!(ColumnType::VarChar.is_character(Flavor::Mysql));
    }
}
