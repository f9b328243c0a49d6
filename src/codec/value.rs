//! Dynamically typed items for collections and maps.
//!
//! A collection declares one [`ItemType`] for all of its elements; each
//! element is a [`Value`] whose variant must match that type. Item type
//! tags are stable and may be stored by callers:
//!
//! | tag | item type     | tag | item type      |
//! |-----|---------------|-----|----------------|
//! | 0   | byte          | 11  | long array     |
//! | 1   | short         | 12  | float array    |
//! | 2   | int (varint)  | 13  | double array   |
//! | 3   | long (varint) | 14  | char array     |
//! | 4   | float         | 15  | boolean array  |
//! | 5   | double        | 16  | string         |
//! | 6   | char          | 17  | bit set        |
//! | 7   | boolean       | 18  | uuid           |
//! | 8   | byte array    | 19  | extended uuid  |
//! | 9   | short array   | 20  | message        |
//! | 10  | int array     |     |                |

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use uuid::Uuid;

use crate::error::DirectError;
use crate::handler::Message;

/// Declared type of the elements of a collection or map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ItemType {
    Byte = 0,
    Short = 1,
    Int = 2,
    Long = 3,
    Float = 4,
    Double = 5,
    Char = 6,
    Boolean = 7,
    ByteArr = 8,
    ShortArr = 9,
    IntArr = 10,
    LongArr = 11,
    FloatArr = 12,
    DoubleArr = 13,
    CharArr = 14,
    BooleanArr = 15,
    String = 16,
    BitSet = 17,
    Uuid = 18,
    ExtendedUuid = 19,
    Msg = 20,
}

impl ItemType {
    /// Every item type in tag order.
    pub const ALL: [ItemType; 21] = [
        ItemType::Byte,
        ItemType::Short,
        ItemType::Int,
        ItemType::Long,
        ItemType::Float,
        ItemType::Double,
        ItemType::Char,
        ItemType::Boolean,
        ItemType::ByteArr,
        ItemType::ShortArr,
        ItemType::IntArr,
        ItemType::LongArr,
        ItemType::FloatArr,
        ItemType::DoubleArr,
        ItemType::CharArr,
        ItemType::BooleanArr,
        ItemType::String,
        ItemType::BitSet,
        ItemType::Uuid,
        ItemType::ExtendedUuid,
        ItemType::Msg,
    ];

    /// Stable wire tag.
    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            ItemType::Byte => "byte",
            ItemType::Short => "short",
            ItemType::Int => "int",
            ItemType::Long => "long",
            ItemType::Float => "float",
            ItemType::Double => "double",
            ItemType::Char => "char",
            ItemType::Boolean => "boolean",
            ItemType::ByteArr => "byte array",
            ItemType::ShortArr => "short array",
            ItemType::IntArr => "int array",
            ItemType::LongArr => "long array",
            ItemType::FloatArr => "float array",
            ItemType::DoubleArr => "double array",
            ItemType::CharArr => "char array",
            ItemType::BooleanArr => "boolean array",
            ItemType::String => "string",
            ItemType::BitSet => "bit set",
            ItemType::Uuid => "uuid",
            ItemType::ExtendedUuid => "extended uuid",
            ItemType::Msg => "message",
        }
    }

    /// Fewest bytes one item of this type can occupy on the wire.
    pub fn min_encoded_len(self) -> usize {
        match self {
            ItemType::Byte | ItemType::Boolean | ItemType::Int | ItemType::Long => 1,
            ItemType::Uuid | ItemType::ExtendedUuid => 1,
            ItemType::Short | ItemType::Char | ItemType::Msg => 2,
            ItemType::Float => 4,
            ItemType::Double => 8,
            _ => 4,
        }
    }

    /// Whether [`Value::Null`] is a legal item of this type.
    #[inline]
    pub fn is_nullable(self) -> bool {
        self.tag() >= ItemType::ByteArr.tag()
    }
}

impl TryFrom<u8> for ItemType {
    type Error = DirectError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        ItemType::ALL.get(tag as usize).copied().ok_or_else(|| {
            tracing::warn!(tag, "unknown item type tag");
            DirectError::UnsupportedType(tag)
        })
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of bits stored as little-endian 64-bit words.
///
/// Trailing zero words are always trimmed, so equal sets have equal words.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from raw words, trimming trailing zeros.
    pub fn from_words(mut words: Vec<u64>) -> Self {
        while words.last() == Some(&0) {
            words.pop();
        }
        Self { words }
    }

    /// Raw words, lowest bits first.
    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Set bit `i`.
    pub fn set(&mut self, i: usize) {
        let word = i / 64;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (i % 64);
    }

    /// Clear bit `i`.
    pub fn clear(&mut self, i: usize) {
        if let Some(w) = self.words.get_mut(i / 64) {
            *w &= !(1u64 << (i % 64));
        }
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }

    /// Whether bit `i` is set.
    pub fn get(&self, i: usize) -> bool {
        self.words
            .get(i / 64)
            .is_some_and(|w| *w & (1u64 << (i % 64)) != 0)
    }

    /// Number of set bits.
    pub fn cardinality(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Whether no bit is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl FromIterator<usize> for BitSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut bits = BitSet::new();
        for i in iter {
            bits.set(i);
        }
        bits
    }
}

/// Globally unique id paired with a locally unique counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtendedUuid {
    pub global_id: Uuid,
    pub local_id: i64,
}

impl ExtendedUuid {
    pub fn new(global_id: Uuid, local_id: i64) -> Self {
        Self {
            global_id,
            local_id,
        }
    }
}

/// One item of a collection or map.
#[derive(Debug)]
pub enum Value {
    /// Absent array, string, UUID or message.
    Null,
    Byte(u8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(u16),
    Boolean(bool),
    ByteArray(Vec<u8>),
    ShortArray(Vec<i16>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    CharArray(Vec<u16>),
    BooleanArray(Vec<bool>),
    String(String),
    BitSet(BitSet),
    Uuid(Uuid),
    ExtendedUuid(ExtendedUuid),
    Message(Box<dyn Message>),
}

impl Value {
    /// Item type this value encodes as, `None` for [`Value::Null`].
    pub fn item_type(&self) -> Option<ItemType> {
        Some(match self {
            Value::Null => return None,
            Value::Byte(_) => ItemType::Byte,
            Value::Short(_) => ItemType::Short,
            Value::Int(_) => ItemType::Int,
            Value::Long(_) => ItemType::Long,
            Value::Float(_) => ItemType::Float,
            Value::Double(_) => ItemType::Double,
            Value::Char(_) => ItemType::Char,
            Value::Boolean(_) => ItemType::Boolean,
            Value::ByteArray(_) => ItemType::ByteArr,
            Value::ShortArray(_) => ItemType::ShortArr,
            Value::IntArray(_) => ItemType::IntArr,
            Value::LongArray(_) => ItemType::LongArr,
            Value::FloatArray(_) => ItemType::FloatArr,
            Value::DoubleArray(_) => ItemType::DoubleArr,
            Value::CharArray(_) => ItemType::CharArr,
            Value::BooleanArray(_) => ItemType::BooleanArr,
            Value::String(_) => ItemType::String,
            Value::BitSet(_) => ItemType::BitSet,
            Value::Uuid(_) => ItemType::Uuid,
            Value::ExtendedUuid(_) => ItemType::ExtendedUuid,
            Value::Message(_) => ItemType::Msg,
        })
    }

    /// Name of the variant, for error messages.
    pub fn kind_name(&self) -> &'static str {
        self.item_type().map_or("null", ItemType::name)
    }

    /// Whether this is [`Value::Null`].
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the string payload.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer payload of the integral variants.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Byte(v) => Some(v as i64),
            Value::Short(v) => Some(v as i64),
            Value::Int(v) => Some(v as i64),
            Value::Long(v) => Some(v),
            Value::Char(v) => Some(v as i64),
            _ => None,
        }
    }

    /// Borrow the nested message.
    pub fn as_message(&self) -> Option<&dyn Message> {
        match self {
            Value::Message(m) => Some(&**m),
            _ => None,
        }
    }
}

// Floats compare by bit pattern so that `Eq` and `Hash` agree.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Byte(a), Byte(b)) => a == b,
            (Short(a), Short(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Long(a), Long(b)) => a == b,
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (Double(a), Double(b)) => a.to_bits() == b.to_bits(),
            (Char(a), Char(b)) => a == b,
            (Boolean(a), Boolean(b)) => a == b,
            (ByteArray(a), ByteArray(b)) => a == b,
            (ShortArray(a), ShortArray(b)) => a == b,
            (IntArray(a), IntArray(b)) => a == b,
            (LongArray(a), LongArray(b)) => a == b,
            (FloatArray(a), FloatArray(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (DoubleArray(a), DoubleArray(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (CharArray(a), CharArray(b)) => a == b,
            (BooleanArray(a), BooleanArray(b)) => a == b,
            (String(a), String(b)) => a == b,
            (BitSet(a), BitSet(b)) => a == b,
            (Uuid(a), Uuid(b)) => a == b,
            (ExtendedUuid(a), ExtendedUuid(b)) => a == b,
            (Message(a), Message(b)) => a.eq_message(&**b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Byte(v) => v.hash(state),
            Value::Short(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Long(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::Char(v) => v.hash(state),
            Value::Boolean(v) => v.hash(state),
            Value::ByteArray(v) => v.hash(state),
            Value::ShortArray(v) => v.hash(state),
            Value::IntArray(v) => v.hash(state),
            Value::LongArray(v) => v.hash(state),
            Value::FloatArray(v) => v.iter().for_each(|x| x.to_bits().hash(state)),
            Value::DoubleArray(v) => v.iter().for_each(|x| x.to_bits().hash(state)),
            Value::CharArray(v) => v.hash(state),
            Value::BooleanArray(v) => v.hash(state),
            Value::String(v) => v.hash(state),
            Value::BitSet(v) => v.hash(state),
            Value::Uuid(v) => v.hash(state),
            Value::ExtendedUuid(v) => v.hash(state),
            // Equal messages always share a type code.
            Value::Message(m) => m.direct_type().hash(state),
        }
    }
}

macro_rules! value_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    u8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    bool => Boolean,
    Vec<u8> => ByteArray,
    Vec<i16> => ShortArray,
    Vec<i32> => IntArray,
    Vec<i64> => LongArray,
    Vec<f32> => FloatArray,
    Vec<f64> => DoubleArray,
    Vec<u16> => CharArray,
    Vec<bool> => BooleanArray,
    String => String,
    BitSet => BitSet,
    Uuid => Uuid,
    ExtendedUuid => ExtendedUuid,
    Box<dyn Message> => Message,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Map read from the wire, insertion-ordered or hashed.
#[derive(Debug)]
pub enum DirectMap {
    /// Keeps the order entries were read in.
    Linked(IndexMap<Value, Value>),
    /// No order guarantee.
    Hashed(HashMap<Value, Value>),
}

impl DirectMap {
    /// Empty map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize, linked: bool) -> Self {
        if linked {
            DirectMap::Linked(IndexMap::with_capacity(capacity))
        } else {
            DirectMap::Hashed(HashMap::with_capacity(capacity))
        }
    }

    /// Insert an entry, returning the previous value for the key.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        match self {
            DirectMap::Linked(m) => m.insert(key, value),
            DirectMap::Hashed(m) => m.insert(key, value),
        }
    }

    /// Look up a key.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        match self {
            DirectMap::Linked(m) => m.get(key),
            DirectMap::Hashed(m) => m.get(key),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        match self {
            DirectMap::Linked(m) => m.len(),
            DirectMap::Hashed(m) => m.len(),
        }
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether iteration follows insertion order.
    pub fn is_linked(&self) -> bool {
        matches!(self, DirectMap::Linked(_))
    }

    /// Iterate over entries.
    pub fn iter(&self) -> DirectMapIter<'_> {
        match self {
            DirectMap::Linked(m) => DirectMapIter::Linked(m.iter()),
            DirectMap::Hashed(m) => DirectMapIter::Hashed(m.iter()),
        }
    }
}

impl PartialEq for DirectMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<'m> IntoIterator for &'m DirectMap {
    type Item = (&'m Value, &'m Value);
    type IntoIter = DirectMapIter<'m>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the entries of a [`DirectMap`].
#[derive(Debug)]
pub enum DirectMapIter<'m> {
    Linked(indexmap::map::Iter<'m, Value, Value>),
    Hashed(std::collections::hash_map::Iter<'m, Value, Value>),
}

impl<'m> Iterator for DirectMapIter<'m> {
    type Item = (&'m Value, &'m Value);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            DirectMapIter::Linked(it) => it.next(),
            DirectMapIter::Hashed(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            DirectMapIter::Linked(it) => it.size_hint(),
            DirectMapIter::Hashed(it) => it.size_hint(),
        }
    }
}

impl ExactSizeIterator for DirectMapIter<'_> {}
