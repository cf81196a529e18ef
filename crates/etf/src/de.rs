use std::slice::Iter;

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::de::{self, DeserializeSeed, EnumAccess, IntoDeserializer, VariantAccess, Visitor};

use crate::error::{Error, Result};
use crate::term::Term;

pub struct Deserializer<'de> {
    input: &'de Term,
}

impl<'de> Deserializer<'de> {
    pub fn from_term(input: &'de Term) -> Self {
        Deserializer { input }
    }
}

/// Reads a `Deserialize` value back out of a [`Term`], the inverse of
/// [`to_term`](crate::to_term).
pub fn from_term<'a, T>(input: &'a Term) -> Result<T>
where
    T: de::Deserialize<'a>,
{
    let mut deserializer = Deserializer::from_term(input);
    T::deserialize(&mut deserializer)
}

fn expected(what: &str, found: &Term) -> Error {
    Error::Serde(format!("expected {}, found {}", what, found.kind()))
}

impl<'de> Deserializer<'de> {
    fn parse_bool(&self) -> Result<bool> {
        match self.input {
            Term::Bool(b) => Ok(*b),
            t => Err(expected("boolean", t)),
        }
    }

    fn parse_int<T: TryFrom<&'de BigInt>>(&self) -> Result<T> {
        match self.input {
            Term::Integer(n) => {
                T::try_from(n).map_err(|_| Error::Serde(format!("integer {} out of range", n)))
            }
            t => Err(expected("integer", t)),
        }
    }

    fn parse_float(&self) -> Result<f64> {
        match self.input {
            Term::Float(v) => Ok(*v),
            Term::Integer(n) => n.to_f64().ok_or(Error::Conversion("f64")),
            t => Err(expected("float", t)),
        }
    }

    fn parse_str(&self) -> Result<&'de str> {
        match self.input {
            Term::Atom(a) => Ok(a.as_str()),
            Term::String(s) => Ok(s),
            Term::Binary(b) => std::str::from_utf8(b.as_bytes())
                .map_err(|e| Error::Serde(format!("binary is not utf-8: {}", e))),
            t => Err(expected("string", t)),
        }
    }

    fn parse_bytes(&self) -> Result<&'de [u8]> {
        match self.input {
            Term::Binary(b) => Ok(b.as_bytes()),
            Term::String(s) => Ok(s.as_bytes()),
            t => Err(expected("binary", t)),
        }
    }

    fn is_none(&self) -> bool {
        matches!(self.input, Term::None)
    }
}

impl<'de> de::Deserializer<'de> for &mut Deserializer<'de> {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.input {
            Term::Bool(b) => visitor.visit_bool(*b),
            Term::None => visitor.visit_unit(),
            Term::Integer(n) => {
                if let Some(v) = n.to_i64() {
                    visitor.visit_i64(v)
                } else if let Some(v) = n.to_u64() {
                    visitor.visit_u64(v)
                } else if let Some(v) = n.to_i128() {
                    visitor.visit_i128(v)
                } else if let Some(v) = n.to_u128() {
                    visitor.visit_u128(v)
                } else {
                    Err(Error::Serde(format!("integer {} out of range", n)))
                }
            }
            Term::Float(v) => visitor.visit_f64(*v),
            Term::Atom(a) => visitor.visit_borrowed_str(a.as_str()),
            Term::String(s) => visitor.visit_borrowed_str(s),
            Term::Binary(b) => visitor.visit_borrowed_bytes(b.as_bytes()),
            Term::List(elems) | Term::Tuple(elems) => {
                visitor.visit_seq(DeserializerSeq::new(elems))
            }
            t @ (Term::Pid(_) | Term::Port(_) | Term::Reference(_) | Term::Export(_)) => {
                Err(Error::unsupported(t))
            }
        }
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_bool(self.parse_bool()?)
    }

    fn deserialize_i8<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_i8(self.parse_int()?)
    }

    fn deserialize_i16<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_i16(self.parse_int()?)
    }

    fn deserialize_i32<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_i32(self.parse_int()?)
    }

    fn deserialize_i64<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_i64(self.parse_int()?)
    }

    fn deserialize_i128<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_i128(self.parse_int()?)
    }

    fn deserialize_u8<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_u8(self.parse_int()?)
    }

    fn deserialize_u16<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_u16(self.parse_int()?)
    }

    fn deserialize_u32<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_u32(self.parse_int()?)
    }

    fn deserialize_u64<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_u64(self.parse_int()?)
    }

    fn deserialize_u128<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_u128(self.parse_int()?)
    }

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_f32(self.parse_float()? as f32)
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_f64(self.parse_float()?)
    }

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let s = self.parse_str()?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => Err(Error::Serde(format!("expected a single char, found {:?}", s))),
        }
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_borrowed_str(self.parse_str()?)
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_borrowed_bytes(self.parse_bytes()?)
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_byte_buf(self.parse_bytes()?.to_vec())
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        if self.is_none() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        if self.is_none() || self.input.is_nil() {
            visitor.visit_unit()
        } else {
            Err(expected("none", self.input))
        }
    }

    fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.input {
            Term::List(elems) => visitor.visit_seq(DeserializerSeq::new(elems)),
            Term::Binary(b) => visitor.visit_borrowed_bytes(b.as_bytes()),
            t => Err(expected("list", t)),
        }
    }

    fn deserialize_tuple<V>(self, len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.input {
            Term::Tuple(elems) if elems.len() == len => {
                visitor.visit_seq(DeserializerSeq::new(elems))
            }
            Term::Tuple(elems) => Err(Error::Serde(format!(
                "expected a tuple of {} elements, found {}",
                len,
                elems.len()
            ))),
            t => Err(expected("tuple", t)),
        }
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_tuple(len, visitor)
    }

    // maps and structs are proplists: [{Key, Value}]
    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.input {
            Term::List(elems) => visitor.visit_map(DeserializerMap::new(elems)),
            t => Err(expected("proplist", t)),
        }
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.input {
            Term::Atom(a) => visitor.visit_enum(a.as_str().into_deserializer()),
            Term::Tuple(elems) => match elems.as_slice() {
                [Term::Atom(variant), value] => {
                    visitor.visit_enum(DeserializerEnum::new(variant.as_str(), value))
                }
                _ => Err(Error::Serde(
                    "expected an enum tuple of the form {variant, value}".to_string(),
                )),
            },
            t => Err(expected("atom or tuple", t)),
        }
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }
}

struct DeserializerSeq<'de> {
    input: Iter<'de, Term>,
}

impl<'de> DeserializerSeq<'de> {
    fn new(input: &'de [Term]) -> Self {
        DeserializerSeq {
            input: input.iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for DeserializerSeq<'de> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        match self.input.next() {
            Some(item) => seed
                .deserialize(&mut Deserializer::from_term(item))
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.input.len())
    }
}

struct DeserializerMap<'de> {
    input: Iter<'de, Term>,
    current_value: Option<&'de Term>,
}

impl<'de> DeserializerMap<'de> {
    fn new(input: &'de [Term]) -> Self {
        DeserializerMap {
            input: input.iter(),
            current_value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for DeserializerMap<'de> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        match self.input.next() {
            Some(Term::Tuple(pair)) if pair.len() == 2 => {
                self.current_value = Some(&pair[1]);
                seed.deserialize(&mut Deserializer::from_term(&pair[0]))
                    .map(Some)
            }
            Some(t) => Err(expected("{key, value} pair", t)),
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        match self.current_value.take() {
            Some(v) => seed.deserialize(&mut Deserializer::from_term(v)),
            None => Err(Error::Serde("proplist value requested before its key".to_string())),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.input.len())
    }
}

struct DeserializerEnum<'de> {
    variant: &'de str,
    value: &'de Term,
}

impl<'de> DeserializerEnum<'de> {
    fn new(variant: &'de str, value: &'de Term) -> Self {
        DeserializerEnum { variant, value }
    }
}

impl<'de> EnumAccess<'de> for DeserializerEnum<'de> {
    type Error = Error;

    type Variant = Self;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: DeserializeSeed<'de>,
    {
        let de: de::value::BorrowedStrDeserializer<'de, Error> =
            de::value::BorrowedStrDeserializer::new(self.variant);
        let v = seed.deserialize(de)?;
        Ok((v, self))
    }
}

impl<'de> VariantAccess<'de> for DeserializerEnum<'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Err(Error::Serde(format!(
            "unit variant {} must be a bare atom",
            self.variant
        )))
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(&mut Deserializer::from_term(self.value))
    }

    fn tuple_variant<V>(self, len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let mut deserializer = Deserializer::from_term(self.value);
        de::Deserializer::deserialize_tuple(&mut deserializer, len, visitor)
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let mut deserializer = Deserializer::from_term(self.value);
        de::Deserializer::deserialize_map(&mut deserializer, visitor)
    }
}
