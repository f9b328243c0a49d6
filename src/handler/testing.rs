//! Small messages shared by unit tests.

use std::any::Any;

use super::{message_eq, Message, MessageReader, MessageRegistry, MessageWriter};
use crate::error::Result;

/// Flat message: a varint long and a nullable string.
#[derive(Debug, Default, PartialEq)]
pub struct Leaf {
    pub id: i64,
    pub name: Option<String>,
}

impl Leaf {
    pub const TYPE: i16 = 1;

    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: Some(name.to_string()),
        }
    }
}

impl Message for Leaf {
    fn direct_type(&self) -> i16 {
        Self::TYPE
    }

    fn write_to(&self, writer: &mut MessageWriter<'_>) -> Result<bool> {
        if !writer.is_header_written() {
            writer.write_header(self.direct_type())?;
            writer.on_header_written();
        }
        if writer.state() == 0 {
            writer.write_long(self.id)?;
            writer.increment_state();
        }
        if writer.state() == 1 {
            writer.write_string(self.name.as_deref())?;
            writer.increment_state();
        }
        Ok(true)
    }

    fn read_from(&mut self, reader: &mut MessageReader<'_>) -> Result<()> {
        self.id = reader.read_long()?;
        self.name = reader.read_string()?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_message(&self, other: &dyn Message) -> bool {
        message_eq(self, other)
    }
}

/// Message with an int and an optional nested child.
#[derive(Debug, Default, PartialEq)]
pub struct Node {
    pub value: i32,
    pub child: Option<Box<dyn Message>>,
}

impl Node {
    pub const TYPE: i16 = 2;

    pub fn new(value: i32, child: Option<Box<dyn Message>>) -> Self {
        Self { value, child }
    }
}

impl Message for Node {
    fn direct_type(&self) -> i16 {
        Self::TYPE
    }

    fn write_to(&self, writer: &mut MessageWriter<'_>) -> Result<bool> {
        if !writer.is_header_written() {
            writer.write_header(self.direct_type())?;
            writer.on_header_written();
        }
        if writer.state() == 0 {
            writer.write_int(self.value)?;
            writer.increment_state();
        }
        if writer.state() == 1 {
            if !writer.write_message(self.child.as_deref())? {
                return Ok(false);
            }
            writer.increment_state();
        }
        Ok(true)
    }

    fn read_from(&mut self, reader: &mut MessageReader<'_>) -> Result<()> {
        self.value = reader.read_int()?;
        self.child = reader.read_message()?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_message(&self, other: &dyn Message) -> bool {
        message_eq(self, other)
    }
}

/// Registry knowing [`Leaf`] and [`Node`].
pub fn registry() -> MessageRegistry {
    let mut registry = MessageRegistry::new();
    registry
        .register::<Leaf>(Leaf::TYPE)
        .expect("register leaf");
    registry
        .register::<Node>(Node::TYPE)
        .expect("register node");
    registry
}
