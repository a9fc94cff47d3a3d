//! Element type tags and the tagged-storage buffer backing variable data.
//!
//! This replaces a dynamic type-switch on a raw element type tag (the
//! classic C approach) with a Rust tagged union: each variant owns its own
//! `Vec<T>`, so there is no `unsafe` reinterpretation of a byte buffer and
//! the compiler enforces that every match over `ElementBuffer` is
//! exhaustive.

use crate::error::{CoreError, ErrorKind};

/// Closed element type tag, mirroring [`ElementBuffer`]'s variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Int8,
    Int16,
    Int32,
    Float32,
    Float64,
    String,
}

impl ElementType {
    pub fn as_str(self) -> &'static str {
        match self {
            ElementType::Int8 => "int8",
            ElementType::Int16 => "int16",
            ElementType::Int32 => "int32",
            ElementType::Float32 => "float32",
            ElementType::Float64 => "float64",
            ElementType::String => "string",
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dense, row-major flat storage for a variable's data, tagged by its
/// element type.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementBuffer {
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    String(Vec<String>),
}

impl ElementBuffer {
    /// Allocates a zero-filled buffer of the given type and length. Strings
    /// default-fill to the empty string.
    pub fn zeros(element_type: ElementType, len: usize) -> Self {
        match element_type {
            ElementType::Int8 => ElementBuffer::Int8(vec![0; len]),
            ElementType::Int16 => ElementBuffer::Int16(vec![0; len]),
            ElementType::Int32 => ElementBuffer::Int32(vec![0; len]),
            ElementType::Float32 => ElementBuffer::Float32(vec![0.0; len]),
            ElementType::Float64 => ElementBuffer::Float64(vec![0.0; len]),
            ElementType::String => ElementBuffer::String(vec![String::new(); len]),
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            ElementBuffer::Int8(_) => ElementType::Int8,
            ElementBuffer::Int16(_) => ElementType::Int16,
            ElementBuffer::Int32(_) => ElementType::Int32,
            ElementBuffer::Float32(_) => ElementType::Float32,
            ElementBuffer::Float64(_) => ElementType::Float64,
            ElementBuffer::String(_) => ElementType::String,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ElementBuffer::Int8(v) => v.len(),
            ElementBuffer::Int16(v) => v.len(),
            ElementBuffer::Int32(v) => v.len(),
            ElementBuffer::Float32(v) => v.len(),
            ElementBuffer::Float64(v) => v.len(),
            ElementBuffer::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coerces to `target`, following C-style numeric truncation for
    /// numeric-to-numeric conversions and `Display` for numeric-to-string.
    /// String is a terminal type: converting a string buffer to a numeric
    /// type fails with `InvalidType` rather than attempting to parse it,
    /// since no locale-free text-to-number contract is specified.
    pub fn coerce(&self, target: ElementType) -> Result<ElementBuffer, CoreError> {
        if self.element_type() == target {
            return Ok(self.clone());
        }
        if let ElementBuffer::String(values) = self {
            if target != ElementType::String {
                return Err(CoreError::with_message(
                    ErrorKind::InvalidType,
                    format!("cannot coerce string element buffer to {target}"),
                ));
            }
            return Ok(ElementBuffer::String(values.clone()));
        }
        if target == ElementType::String {
            return Ok(ElementBuffer::String(self.to_f64_vec()?.iter().map(|v| v.to_string()).collect()));
        }
        let floats = self.to_f64_vec()?;
        Ok(match target {
            ElementType::Int8 => ElementBuffer::Int8(floats.iter().map(|&v| v as i8).collect()),
            ElementType::Int16 => ElementBuffer::Int16(floats.iter().map(|&v| v as i16).collect()),
            ElementType::Int32 => ElementBuffer::Int32(floats.iter().map(|&v| v as i32).collect()),
            ElementType::Float32 => ElementBuffer::Float32(floats.iter().map(|&v| v as f32).collect()),
            ElementType::Float64 => ElementBuffer::Float64(floats),
            ElementType::String => unreachable!("handled above"),
        })
    }

    /// Widens any numeric buffer to `f64` for interpolation/unit-conversion
    /// math. Fails for string buffers.
    pub fn to_f64_vec(&self) -> Result<Vec<f64>, CoreError> {
        match self {
            ElementBuffer::Int8(v) => Ok(v.iter().map(|&x| f64::from(x)).collect()),
            ElementBuffer::Int16(v) => Ok(v.iter().map(|&x| f64::from(x)).collect()),
            ElementBuffer::Int32(v) => Ok(v.iter().map(|&x| f64::from(x)).collect()),
            ElementBuffer::Float32(v) => Ok(v.iter().map(|&x| f64::from(x)).collect()),
            ElementBuffer::Float64(v) => Ok(v.clone()),
            ElementBuffer::String(_) => Err(CoreError::with_message(
                ErrorKind::InvalidType,
                "string element buffer has no numeric representation",
            )),
        }
    }

    pub fn as_f64_slice(&self) -> Result<&[f64], CoreError> {
        match self {
            ElementBuffer::Float64(v) => Ok(v),
            other => Err(CoreError::with_message(
                ErrorKind::InvalidType,
                format!("expected float64 element buffer, found {}", other.element_type()),
            )),
        }
    }

    pub fn as_f64_slice_mut(&mut self) -> Result<&mut [f64], CoreError> {
        match self {
            ElementBuffer::Float64(v) => Ok(v),
            other => Err(CoreError::with_message(
                ErrorKind::InvalidType,
                format!("expected float64 element buffer, found {}", other.element_type()),
            )),
        }
    }
}
