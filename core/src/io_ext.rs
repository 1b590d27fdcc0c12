use std::io::{
	Error,
	ErrorKind,
	Read,
	Result,
	Write
};

use ultraviolet::vec::{
	Vec2,
	Vec3
};

pub trait ReadBinExt: Read {
	/// Reads a null-terminated ASCII string
	#[inline]
	fn read_cstr(&mut self) -> Result<String> {
		let mut s = String::new();
		let mut buf = [1; 1];

		while buf[0] != 0 {
			self.read_exact(&mut buf)?;
			if buf[0] != 0 {
				if !buf[0].is_ascii() {
					return Err(Error::new(ErrorKind::InvalidData, "non-ASCII byte in string field"));
				}

				s.push(buf[0] as char);
			}
		}

		Ok(s)
	}

	/// Reads a fixed-width field holding a null-padded ASCII string.
	/// The whole field is always consumed, regardless of where the
	/// terminator sits. Bytes past 0x7F have no single encoding these
	/// formats agree on and are rejected rather than mangled.
	#[inline]
	fn read_str_fixed(&mut self, width: usize) -> Result<String> {
		let mut raw = vec![0; width];
		self.read_exact(raw.as_mut_slice())?;

		let mut s = String::new();
		for b in raw.iter() {
			if *b == 0 {
				break;
			}

			if !b.is_ascii() {
				return Err(Error::new(ErrorKind::InvalidData, "non-ASCII byte in string field"));
			}

			s.push(*b as char);
		}

		Ok(s)
	}

	/// Reads a little endian 2D vector
	#[inline]
	fn read_vec2_le(&mut self) -> Result<Vec2> {
		let mut x = [0; 4];
		let mut y = x;

		self.read_exact(&mut x)?;
		self.read_exact(&mut y)?;

		Ok(Vec2::new(f32::from_le_bytes(x), f32::from_le_bytes(y)))
	}

	/// Reads a little endian 3D vector
	#[inline]
	fn read_vec3_le(&mut self) -> Result<Vec3> {
		let mut x = [0; 4];
		let mut y = x;
		let mut z = y;

		self.read_exact(&mut x)?;
		self.read_exact(&mut y)?;
		self.read_exact(&mut z)?;

		Ok(Vec3::new(f32::from_le_bytes(x), f32::from_le_bytes(y), f32::from_le_bytes(z)))
	}
}

impl<R> ReadBinExt for R
where
	R: Read + ?Sized,
{
}

pub trait WriteBinExt: Write {
	/// Writes a null-terminated ASCII string
	#[inline]
	fn write_cstr(&mut self, s: &str) -> Result<()> {
		if !s.is_ascii() {
			return Err(Error::new(ErrorKind::InvalidInput, "non-ASCII string"));
		}

		self.write_all(s.as_bytes())?;
		self.write_all(&[0])
	}

	/// Writes an ASCII string into a fixed-width field, null-padding the
	/// remainder. Fails if the string does not fit.
	#[inline]
	fn write_str_fixed(&mut self, s: &str, width: usize) -> Result<()> {
		if !s.is_ascii() {
			return Err(Error::new(ErrorKind::InvalidInput, "non-ASCII string"));
		}

		if s.len() > width {
			return Err(Error::new(ErrorKind::InvalidInput, "string wider than its field"));
		}

		self.write_all(s.as_bytes())?;
		self.write_zeros(width - s.len())
	}

	/// Writes a run of zero bytes
	#[inline]
	fn write_zeros(&mut self, count: usize) -> Result<()> {
		for _ in 0..count {
			self.write_all(&[0])?;
		}

		Ok(())
	}

	/// Writes a little endian 2D vector
	#[inline]
	fn write_vec2_le(&mut self, v: Vec2) -> Result<()> {
		self.write_all(&v.x.to_le_bytes())?;
		self.write_all(&v.y.to_le_bytes())
	}

	/// Writes a little endian 3D vector
	#[inline]
	fn write_vec3_le(&mut self, v: Vec3) -> Result<()> {
		self.write_all(&v.x.to_le_bytes())?;
		self.write_all(&v.y.to_le_bytes())?;
		self.write_all(&v.z.to_le_bytes())
	}
}

impl<W> WriteBinExt for W
where
	W: Write + ?Sized,
{
}
