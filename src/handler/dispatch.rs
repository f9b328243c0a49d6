//! Typed item dispatch for object arrays, collections and maps.
//!
//! Every container is a 4-byte count (`-1` for absent) followed by its
//! items, each encoded according to the container's declared
//! [`ItemType`]. Map entries are interleaved key, value, key, value.

use super::{MessageReader, MessageWriter};
use crate::codec::{DirectMap, ItemType, Value};
use crate::error::{DirectError, Result};
use crate::protocol::{encode_length, LENGTH_PREFIX_SIZE, NULL_MESSAGE_TYPE};

/// UUID null flag.
const UUID_NULL: u8 = 1;

impl MessageWriter<'_> {
    /// Write one item as `item_type`.
    ///
    /// [`Value::Null`] is accepted for the nullable item types only. A
    /// nested message that suspends is an error here, since containers are
    /// written in one go.
    pub fn write_item(&mut self, item_type: ItemType, value: &Value) -> Result<()> {
        match (item_type, value) {
            (ItemType::Byte, Value::Byte(v)) => self.write_byte(*v),
            (ItemType::Short, Value::Short(v)) => self.write_short(*v),
            (ItemType::Int, Value::Int(v)) => self.write_int(*v),
            (ItemType::Long, Value::Long(v)) => self.write_long(*v),
            (ItemType::Float, Value::Float(v)) => self.write_float(*v),
            (ItemType::Double, Value::Double(v)) => self.write_double(*v),
            (ItemType::Char, Value::Char(v)) => self.write_char(*v),
            (ItemType::Boolean, Value::Boolean(v)) => self.write_boolean(*v),
            (ItemType::ByteArr, Value::ByteArray(v)) => self.write_byte_array(Some(v)),
            (ItemType::ShortArr, Value::ShortArray(v)) => self.write_short_array(Some(v)),
            (ItemType::IntArr, Value::IntArray(v)) => self.write_int_array(Some(v)),
            (ItemType::LongArr, Value::LongArray(v)) => self.write_long_array(Some(v)),
            (ItemType::FloatArr, Value::FloatArray(v)) => self.write_float_array(Some(v)),
            (ItemType::DoubleArr, Value::DoubleArray(v)) => self.write_double_array(Some(v)),
            (ItemType::CharArr, Value::CharArray(v)) => self.write_char_array(Some(v)),
            (ItemType::BooleanArr, Value::BooleanArray(v)) => self.write_boolean_array(Some(v)),
            (ItemType::String, Value::String(v)) => self.write_string(Some(v)),
            (ItemType::BitSet, Value::BitSet(v)) => self.write_bit_set(Some(v)),
            (ItemType::Uuid, Value::Uuid(v)) => self.write_uuid(Some(v)),
            (ItemType::ExtendedUuid, Value::ExtendedUuid(v)) => self.write_extended_uuid(Some(v)),
            (ItemType::Msg, Value::Message(m)) => {
                if self.write_message(Some(&**m))? {
                    Ok(())
                } else {
                    Err(self.fail(DirectError::SuspendedInCollection(m.direct_type())))
                }
            }
            (ty, Value::Null) if ty.is_nullable() => self.write_null(ty),
            (ty, v) => Err(self.fail(DirectError::TypeMismatch {
                expected: ty.name(),
                found: v.kind_name(),
            })),
        }
    }

    fn write_null(&mut self, item_type: ItemType) -> Result<()> {
        match item_type {
            ItemType::Uuid | ItemType::ExtendedUuid => self.write_byte(UUID_NULL),
            ItemType::Msg => self.write_short(NULL_MESSAGE_TYPE),
            _ => self.put_null_length(),
        }
    }

    fn write_items<'v, I>(&mut self, items: I, item_type: ItemType) -> Result<()>
    where
        I: ExactSizeIterator<Item = &'v Value>,
    {
        let len = encode_length(items.len()).map_err(|e| self.fail(e))?;
        self.write_int_fixed(len)?;
        for item in items {
            self.write_item(item_type, item)?;
        }
        Ok(())
    }

    /// Write an array of items, all of `item_type`.
    pub fn write_object_array(
        &mut self,
        items: Option<&[Value]>,
        item_type: ItemType,
    ) -> Result<()> {
        match items {
            Some(items) => self.write_items(items.iter(), item_type),
            None => self.put_null_length(),
        }
    }

    /// Write a list of items.
    ///
    /// Produces exactly the bytes of [`write_collection`](Self::write_collection).
    /// The length is known up front, so the scratch buffer grows once to
    /// the smallest possible encoding of the whole list before any item is
    /// written.
    pub fn write_list(&mut self, items: Option<&[Value]>, item_type: ItemType) -> Result<()> {
        let Some(items) = items else {
            return self.put_null_length();
        };
        let min_len = items
            .len()
            .saturating_mul(item_type.min_encoded_len())
            .saturating_add(LENGTH_PREFIX_SIZE);
        self.reserve_ahead(min_len)?;
        self.write_items(items.iter(), item_type)
    }

    /// Write any sized collection of items.
    pub fn write_collection<'v, I>(&mut self, items: Option<I>, item_type: ItemType) -> Result<()>
    where
        I: IntoIterator<Item = &'v Value>,
        I::IntoIter: ExactSizeIterator,
    {
        match items {
            Some(items) => self.write_items(items.into_iter(), item_type),
            None => self.put_null_length(),
        }
    }

    /// Write map entries as interleaved keys and values.
    pub fn write_map<'v, I>(
        &mut self,
        entries: Option<I>,
        key_type: ItemType,
        value_type: ItemType,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (&'v Value, &'v Value)>,
        I::IntoIter: ExactSizeIterator,
    {
        let Some(entries) = entries else {
            return self.put_null_length();
        };
        let entries = entries.into_iter();
        let len = encode_length(entries.len()).map_err(|e| self.fail(e))?;
        self.write_int_fixed(len)?;
        for (key, value) in entries {
            self.write_item(key_type, key)?;
            self.write_item(value_type, value)?;
        }
        Ok(())
    }
}

fn nullable<T>(value: Option<T>, wrap: impl FnOnce(T) -> Value) -> Value {
    value.map_or(Value::Null, wrap)
}

impl MessageReader<'_> {
    /// Read one item of `item_type`.
    pub fn read_item(&mut self, item_type: ItemType) -> Result<Value> {
        Ok(match item_type {
            ItemType::Byte => Value::Byte(self.read_byte()?),
            ItemType::Short => Value::Short(self.read_short()?),
            ItemType::Int => Value::Int(self.read_int()?),
            ItemType::Long => Value::Long(self.read_long()?),
            ItemType::Float => Value::Float(self.read_float()?),
            ItemType::Double => Value::Double(self.read_double()?),
            ItemType::Char => Value::Char(self.read_char()?),
            ItemType::Boolean => Value::Boolean(self.read_boolean()?),
            ItemType::ByteArr => nullable(self.read_byte_array()?, Value::ByteArray),
            ItemType::ShortArr => nullable(self.read_short_array()?, Value::ShortArray),
            ItemType::IntArr => nullable(self.read_int_array()?, Value::IntArray),
            ItemType::LongArr => nullable(self.read_long_array()?, Value::LongArray),
            ItemType::FloatArr => nullable(self.read_float_array()?, Value::FloatArray),
            ItemType::DoubleArr => nullable(self.read_double_array()?, Value::DoubleArray),
            ItemType::CharArr => nullable(self.read_char_array()?, Value::CharArray),
            ItemType::BooleanArr => nullable(self.read_boolean_array()?, Value::BooleanArray),
            ItemType::String => nullable(self.read_string()?, Value::String),
            ItemType::BitSet => nullable(self.read_bit_set()?, Value::BitSet),
            ItemType::Uuid => nullable(self.read_uuid()?, Value::Uuid),
            ItemType::ExtendedUuid => nullable(self.read_extended_uuid()?, Value::ExtendedUuid),
            ItemType::Msg => nullable(self.read_message()?, Value::Message),
        })
    }

    /// Read an array of items written by
    /// [`write_object_array`](MessageWriter::write_object_array).
    pub fn read_object_array(&mut self, item_type: ItemType) -> Result<Option<Vec<Value>>> {
        self.read_items("object array", item_type)
    }

    /// Read a collection written by `write_collection` or `write_list`.
    pub fn read_collection(&mut self, item_type: ItemType) -> Result<Option<Vec<Value>>> {
        self.read_items("collection", item_type)
    }

    fn read_items(
        &mut self,
        kind: &'static str,
        item_type: ItemType,
    ) -> Result<Option<Vec<Value>>> {
        // Every item takes at least one byte.
        let Some(len) = self.take_length(kind, 1)? else {
            return Ok(None);
        };
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(self.read_item(item_type)?);
        }
        Ok(Some(items))
    }

    /// Read a map; `linked` keeps the entries in wire order.
    pub fn read_map(
        &mut self,
        key_type: ItemType,
        value_type: ItemType,
        linked: bool,
    ) -> Result<Option<DirectMap>> {
        let Some(len) = self.take_length("map", 2)? else {
            return Ok(None);
        };
        let mut map = DirectMap::with_capacity(len, linked);
        for _ in 0..len {
            let key = self.read_item(key_type)?;
            let value = self.read_item(value_type)?;
            map.insert(key, value);
        }
        Ok(Some(map))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::*;
    use crate::codec::{BitSet, ExtendedUuid};
    use crate::handler::testing::{registry, Leaf};
    use crate::handler::{CodecConfig, Message, MessageHandler};
    use crate::protocol::{ByteOrder, Frame};

    fn round_trip<T>(
        order: ByteOrder,
        write: impl FnOnce(&mut MessageWriter<'_>) -> Result<()>,
        read: impl FnOnce(&mut MessageReader<'_>) -> Result<T>,
    ) -> T {
        let config = CodecConfig {
            byte_order: order,
            ..Default::default()
        };
        let mut handler = MessageHandler::with_config(Arc::new(registry()), config);
        let mut frame = Frame::new();
        let mut writer = handler.for_write(&mut frame);
        write(&mut writer).unwrap();
        writer.close();

        frame.rewind();
        let mut reader = handler.for_read(&mut frame).unwrap();
        let out = read(&mut reader).unwrap();
        assert_eq!(reader.remaining(), 0);
        out
    }

    fn sample(item_type: ItemType) -> Value {
        match item_type {
            ItemType::Byte => Value::Byte(0xFE),
            ItemType::Short => Value::Short(-300),
            ItemType::Int => Value::Int(i32::MIN),
            ItemType::Long => Value::Long(300),
            ItemType::Float => Value::Float(f32::from_bits(0x7FC0_0001)),
            ItemType::Double => Value::Double(-0.0),
            ItemType::Char => Value::Char(0x263A),
            ItemType::Boolean => Value::Boolean(true),
            ItemType::ByteArr => Value::ByteArray(vec![1, 2, 3]),
            ItemType::ShortArr => Value::ShortArray(vec![i16::MIN, 0, i16::MAX]),
            ItemType::IntArr => Value::IntArray(vec![-1, 7]),
            ItemType::LongArr => Value::LongArray(vec![i64::MAX]),
            ItemType::FloatArr => Value::FloatArray(vec![f32::INFINITY, 1.5]),
            ItemType::DoubleArr => Value::DoubleArray(vec![f64::NEG_INFINITY]),
            ItemType::CharArr => Value::CharArray(vec![0x41, 0xD83D]),
            ItemType::BooleanArr => Value::BooleanArray(vec![true, false]),
            ItemType::String => Value::from("héllo"),
            ItemType::BitSet => Value::BitSet([3, 100].into_iter().collect::<BitSet>()),
            ItemType::Uuid => Value::Uuid(Uuid::from_u64_pair(u64::MAX, 42)),
            ItemType::ExtendedUuid => {
                Value::ExtendedUuid(ExtendedUuid::new(Uuid::from_u64_pair(9, 8), -1))
            }
            ItemType::Msg => Value::Message(Box::new(Leaf::new(5, "leaf"))),
        }
    }

    #[test]
    fn test_every_item_type_round_trips() {
        for order in [ByteOrder::Little, ByteOrder::Big] {
            for ty in ItemType::ALL {
                let value = sample(ty);
                let decoded = round_trip(order, |w| w.write_item(ty, &value), |r| r.read_item(ty));
                assert_eq!(decoded, value, "{ty} ({order:?})");
            }
        }
    }

    #[test]
    fn test_null_items_round_trip() {
        for ty in ItemType::ALL.into_iter().filter(|t| t.is_nullable()) {
            let decoded = round_trip(
                ByteOrder::Little,
                |w| w.write_item(ty, &Value::Null),
                |r| r.read_item(ty),
            );
            assert_eq!(decoded, Value::Null, "{ty}");
        }
    }

    #[test]
    fn test_null_scalar_rejected() {
        let mut handler = MessageHandler::new(Arc::new(registry()));
        let mut frame = Frame::new();
        let mut writer = handler.for_write(&mut frame);
        let err = writer.write_item(ItemType::Int, &Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "Type mismatch: expected int, found null");
    }

    #[test]
    fn test_type_mismatch() {
        let mut handler = MessageHandler::new(Arc::new(registry()));
        let mut frame = Frame::new();
        let mut writer = handler.for_write(&mut frame);
        let err = writer.write_item(ItemType::Long, &Value::Int(1)).unwrap_err();
        assert!(matches!(
            err,
            DirectError::TypeMismatch { expected: "long", found: "int" }
        ));
    }

    #[test]
    fn test_list_grows_once_for_known_length() {
        let config = CodecConfig {
            initial_buffer_size: 8,
            ..Default::default()
        };
        let items: Vec<Value> = (0..300).map(|i| Value::Double(i as f64)).collect();

        let mut list_handler = MessageHandler::with_config(Arc::new(registry()), config.clone());
        let mut list_frame = Frame::new();
        let mut writer = list_handler.for_write(&mut list_frame);
        writer.write_list(Some(&items[..]), ItemType::Double).unwrap();
        assert_eq!(writer.capacity(), 4096);
        writer.write_list(None, ItemType::Double).unwrap();
        writer.close();

        let mut handler = MessageHandler::with_config(Arc::new(registry()), config);
        let mut frame = Frame::new();
        let mut writer = handler.for_write(&mut frame);
        writer.write_collection(Some(&items), ItemType::Double).unwrap();
        writer.write_collection(None::<&Vec<Value>>, ItemType::Double).unwrap();
        writer.close();

        assert_eq!(list_frame.data(), frame.data());
        assert_eq!(list_frame.size(), Some(4 + 300 * 8 + 4));
    }

    #[test]
    fn test_list_and_collection_bytes_match() {
        let items: Vec<Value> = (0..5).map(Value::Int).collect();

        let encode = |use_list: bool| {
            let mut handler = MessageHandler::new(Arc::new(registry()));
            let mut frame = Frame::new();
            let mut writer = handler.for_write(&mut frame);
            if use_list {
                writer.write_list(Some(&items[..]), ItemType::Int).unwrap();
            } else {
                writer.write_collection(Some(&items), ItemType::Int).unwrap();
            }
            writer.close();
            frame.into_vec()
        };

        let list = encode(true);
        assert_eq!(list, encode(false));
        assert_eq!(&list[..4], &[5, 0, 0, 0]);
        assert_eq!(&list[4..], &[0x01, 0x02, 0x03, 0x04, 0x05]);
    }

    #[test]
    fn test_collections_of_various_sizes() {
        for n in [0usize, 1, 17] {
            let items: Vec<Value> = (0..n as i32).map(Value::Int).collect();
            let decoded = round_trip(
                ByteOrder::Little,
                |w| w.write_collection(Some(&items), ItemType::Int),
                |r| r.read_collection(ItemType::Int),
            );
            assert_eq!(decoded, Some(items));
        }

        let decoded = round_trip(
            ByteOrder::Little,
            |w| w.write_collection(None::<&Vec<Value>>, ItemType::Int),
            |r| r.read_collection(ItemType::Int),
        );
        assert_eq!(decoded, None);
    }

    #[test]
    fn test_object_array_of_messages() {
        let items = vec![
            Value::Message(Box::new(Leaf::new(1, "a"))),
            Value::Null,
            Value::Message(Box::new(Leaf::new(2, "b"))),
        ];
        let decoded = round_trip(
            ByteOrder::Little,
            |w| w.write_object_array(Some(&items[..]), ItemType::Msg),
            |r| r.read_object_array(ItemType::Msg),
        )
        .unwrap();

        assert_eq!(decoded, items);
        let second = decoded[2].as_message().unwrap();
        assert_eq!(second.downcast_ref::<Leaf>().map(|l| l.id), Some(2));
    }

    #[test]
    fn test_linked_map_keeps_order() {
        let keys = ["zeta", "alpha", "mid"];
        let entries: Vec<(Value, Value)> = keys
            .iter()
            .enumerate()
            .map(|(i, k)| (Value::from(*k), Value::Long(i as i64)))
            .collect();

        let decoded = round_trip(
            ByteOrder::Little,
            |w| {
                w.write_map(
                    Some(entries.iter().map(|(k, v)| (k, v))),
                    ItemType::String,
                    ItemType::Long,
                )
            },
            |r| r.read_map(ItemType::String, ItemType::Long, true),
        )
        .unwrap();

        assert!(decoded.is_linked());
        let order: Vec<&str> = decoded.iter().filter_map(|(k, _)| k.as_str()).collect();
        assert_eq!(order, keys);
        assert_eq!(decoded.get(&Value::from("mid")), Some(&Value::Long(2)));
    }

    #[test]
    fn test_hashed_map_and_null_map() {
        let mut source = DirectMap::with_capacity(2, false);
        source.insert(Value::Int(1), Value::from("one"));
        source.insert(Value::Int(2), Value::Null);

        let decoded = round_trip(
            ByteOrder::Big,
            |w| w.write_map(Some(&source), ItemType::Int, ItemType::String),
            |r| r.read_map(ItemType::Int, ItemType::String, false),
        )
        .unwrap();
        assert!(!decoded.is_linked());
        assert_eq!(decoded, source);

        let null = round_trip(
            ByteOrder::Little,
            |w| w.write_map(None::<&DirectMap>, ItemType::Int, ItemType::Int),
            |r| r.read_map(ItemType::Int, ItemType::Int, true),
        );
        assert!(null.is_none());
    }

    #[test]
    fn test_collection_count_beyond_frame() {
        let mut handler = MessageHandler::new(Arc::new(registry()));
        let mut bytes = 1_000_000i32.to_le_bytes().to_vec();
        bytes.push(0x01);
        let mut frame = Frame::from_vec(bytes);
        let mut reader = handler.for_read(&mut frame).unwrap();
        let err = reader.read_collection(ItemType::Int).unwrap_err();
        assert!(matches!(err, DirectError::BufferUnderflow { .. }));
    }

    #[test]
    fn test_negative_collection_count() {
        let mut handler = MessageHandler::new(Arc::new(registry()));
        let mut frame = Frame::from_vec((-5i32).to_le_bytes().to_vec());
        let mut reader = handler.for_read(&mut frame).unwrap();
        let err = reader.read_map(ItemType::Int, ItemType::Int, true).unwrap_err();
        assert_eq!(err.to_string(), "Read invalid map length: -5");
    }

    #[derive(Debug, Default)]
    struct Stalls;

    impl Message for Stalls {
        fn direct_type(&self) -> i16 {
            9
        }

        fn write_to(&self, writer: &mut MessageWriter<'_>) -> Result<bool> {
            writer.write_header(9)?;
            Ok(false)
        }

        fn read_from(&mut self, _reader: &mut MessageReader<'_>) -> Result<()> {
            Ok(())
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn eq_message(&self, other: &dyn Message) -> bool {
            other.direct_type() == 9
        }
    }

    #[test]
    fn test_suspended_item_is_error() {
        let mut handler = MessageHandler::new(Arc::new(registry()));
        let mut frame = Frame::new();
        let mut writer = handler.for_write(&mut frame);
        let items = vec![Value::Message(Box::new(Stalls))];
        let err = writer.write_list(Some(&items[..]), ItemType::Msg).unwrap_err();
        assert!(matches!(err, DirectError::SuspendedInCollection(9)));
        assert_eq!(writer.depth(), 0);
    }
}
