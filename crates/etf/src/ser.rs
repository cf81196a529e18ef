use serde::{ser, Serialize};

use crate::error::{Error, Result};
use crate::term::Term;
use crate::types::{Atom, Binary};

/// Builds a [`Term`] out of any `Serialize` value.
///
/// Structs and maps become proplists, `[{key, value}]`, with struct fields as atom keys.
/// Enum variants become atoms, or `{variant, payload}` tuples when they carry data.
pub struct Serializer;

pub fn to_term<T>(value: &T) -> Result<Term>
where
    T: Serialize + ?Sized,
{
    value.serialize(&mut Serializer)
}

fn tagged(variant: &'static str, value: Term) -> Term {
    Term::Tuple(vec![Term::atom(variant), value])
}

impl<'a> ser::Serializer for &'a mut Serializer {
    type Ok = Term;

    type Error = Error;

    type SerializeSeq = Compound<'a>;

    type SerializeTuple = Compound<'a>;

    type SerializeTupleStruct = Compound<'a>;

    type SerializeTupleVariant = Compound<'a>;

    type SerializeMap = Compound<'a>;

    type SerializeStruct = Compound<'a>;

    type SerializeStructVariant = Compound<'a>;

    fn serialize_bool(self, v: bool) -> Result<Self::Ok> {
        Ok(Term::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Self::Ok> {
        Ok(Term::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Self::Ok> {
        Ok(Term::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Self::Ok> {
        Ok(Term::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Self::Ok> {
        Ok(Term::from(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Self::Ok> {
        Ok(Term::from(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Self::Ok> {
        Ok(Term::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Self::Ok> {
        Ok(Term::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Self::Ok> {
        Ok(Term::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Self::Ok> {
        Ok(Term::from(v))
    }

    fn serialize_u128(self, v: u128) -> Result<Self::Ok> {
        Ok(Term::from(v))
    }

    fn serialize_f32(self, v: f32) -> Result<Self::Ok> {
        self.serialize_f64(v as f64)
    }

    fn serialize_f64(self, v: f64) -> Result<Self::Ok> {
        Ok(Term::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok> {
        Ok(Term::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok> {
        Ok(Term::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Self::Ok> {
        Ok(Term::Binary(Binary(v.to_vec())))
    }

    fn serialize_none(self) -> Result<Self::Ok> {
        Ok(Term::None)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Self::Ok>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok> {
        self.serialize_none()
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok> {
        self.serialize_none()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok> {
        Ok(Term::Atom(Atom::new(variant)))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<Self::Ok>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Self::Ok>
    where
        T: Serialize + ?Sized,
    {
        let value = value.serialize(self)?;
        Ok(tagged(variant, value))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        Ok(Compound::new(self, len.unwrap_or_default(), None))
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        Ok(Compound::new(self, len, None))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Ok(Compound::new(self, len, None))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Ok(Compound::new(self, len, Some(variant)))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap> {
        Ok(Compound::new(self, len.unwrap_or_default(), None))
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<Self::SerializeStruct> {
        Ok(Compound::new(self, len, None))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Ok(Compound::new(self, len, Some(variant)))
    }
}

pub struct Compound<'a> {
    ser: &'a mut Serializer,
    // Only used by tuple and struct variants
    name: Option<&'static str>,
    elems: Vec<Term>,
    key: Option<Term>,
}

impl<'a> Compound<'a> {
    fn new(ser: &'a mut Serializer, len: usize, name: Option<&'static str>) -> Self {
        Compound {
            ser,
            name,
            elems: Vec::with_capacity(len),
            key: None,
        }
    }

    fn push<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let v = value.serialize(&mut *self.ser)?;
        self.elems.push(v);
        Ok(())
    }

    fn push_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let v = value.serialize(&mut *self.ser)?;
        self.elems.push(Term::Tuple(vec![Term::atom(key), v]));
        Ok(())
    }

    fn variant(self, inner: Term) -> Term {
        match self.name {
            Some(name) => tagged(name, inner),
            None => inner,
        }
    }
}

impl ser::SerializeSeq for Compound<'_> {
    type Ok = Term;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok> {
        Ok(Term::List(self.elems))
    }
}

impl ser::SerializeTuple for Compound<'_> {
    type Ok = Term;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok> {
        Ok(Term::Tuple(self.elems))
    }
}

impl ser::SerializeTupleStruct for Compound<'_> {
    type Ok = Term;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok> {
        Ok(Term::Tuple(self.elems))
    }
}

// {variant, {elems}}
impl ser::SerializeTupleVariant for Compound<'_> {
    type Ok = Term;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(mut self) -> Result<Self::Ok> {
        let inner = Term::Tuple(std::mem::take(&mut self.elems));
        Ok(self.variant(inner))
    }
}

impl ser::SerializeMap for Compound<'_> {
    type Ok = Term;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.key = Some(key.serialize(&mut *self.ser)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .key
            .take()
            .ok_or_else(|| Error::Serde("map value without a key".to_string()))?;
        let v = value.serialize(&mut *self.ser)?;
        self.elems.push(Term::Tuple(vec![key, v]));
        Ok(())
    }

    fn end(self) -> Result<Self::Ok> {
        Ok(Term::List(self.elems))
    }
}

impl ser::SerializeStruct for Compound<'_> {
    type Ok = Term;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push_field(key, value)
    }

    fn end(self) -> Result<Self::Ok> {
        Ok(Term::List(self.elems))
    }
}

// {variant, [{key, value}]}
impl ser::SerializeStructVariant for Compound<'_> {
    type Ok = Term;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push_field(key, value)
    }

    fn end(mut self) -> Result<Self::Ok> {
        let inner = Term::List(std::mem::take(&mut self.elems));
        Ok(self.variant(inner))
    }
}
