use gck_core::scene::{
	Mesh,
	Skeleton
};

use byteorder::LE;

#[cfg(feature = "import")]
use byteorder::ReadBytesExt;

#[cfg(feature = "export")]
use byteorder::WriteBytesExt;

#[cfg(feature = "import")]
use std::io::{
	Seek,
	SeekFrom
};

use ultraviolet::vec::Vec2;

#[cfg(feature = "import")]
use gck_core::io_ext::ReadBinExt;

#[cfg(feature = "export")]
use gck_core::io_ext::WriteBinExt;

#[cfg(feature = "import")]
use gck_core::scene::{
	MeshSink,
	Vertex
};

#[cfg(feature = "export")]
use gck_core::scene::MeshSource;

use crate::skel::{
	self,
	remap,
	JOINT_LEN,
	POSITION_LEN,
	SENTINEL
};

#[cfg(feature = "import")]
use import::{
	resolve_binding,
	P3MImportError
};

#[cfg(feature = "export")]
use export::P3MExportError;

pub static MAGIC: &str = "Perfect 3D Model (Ver 0.5)";
static MAGIC_PREFIX: &str = "Perfect 3D Model";

/// Size of the null-terminated magic/version field
pub const MAGIC_LEN: usize = 27;

/// Size of the reserved texture name field
pub const TEXTURE_NAME_LEN: usize = 260;

pub const FACE_LEN: usize = 6;
pub const VERTEX_LEN: usize = 40;

/// A fully decoded model: bone tree plus bound mesh, in editor space.
/// Built wholesale by one read or consumed by one write, never mutated
/// in between.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Model {
	pub skeleton: Skeleton,
	pub mesh: Mesh,
	pub texture_name: String,
}

impl Model {
	#[cfg(feature = "import")]
	pub fn read<R>(buf: &mut R) -> Result<Model, P3MImportError>
	where
		R: ReadBytesExt + Seek,
	{
		let magic = buf.read_str_fixed(MAGIC_LEN)?;
		if !magic.starts_with(MAGIC_PREFIX) {
			return Err(P3MImportError::Magic(magic));
		}

		let npos = buf.read_u8()? as usize;
		let njoints = buf.read_u8()? as usize;

		check_remaining(buf, (npos * POSITION_LEN + njoints * JOINT_LEN) as u64)?;

		let mut positions = Vec::with_capacity(npos);
		for _ in 0..npos {
			positions.push(skel::PositionNode::read(buf)?);
		}

		let mut joints = Vec::with_capacity(njoints);
		for _ in 0..njoints {
			joints.push(skel::JointNode::read(buf)?);
		}

		let skeleton = skel::decode(&positions, &joints)?;

		let nverts = buf.read_u16::<LE>()? as usize;
		let nfaces = buf.read_u16::<LE>()? as usize;

		check_remaining(buf, (TEXTURE_NAME_LEN + nfaces * FACE_LEN + nverts * VERTEX_LEN) as u64)?;

		let texture_name = buf.read_str_fixed(TEXTURE_NAME_LEN)?;

		let mut mesh = Mesh::new();

		for _ in 0..nfaces {
			let face = [
				buf.read_u16::<LE>()?,
				buf.read_u16::<LE>()?,
				buf.read_u16::<LE>()?,
			];

			for v in face.iter() {
				if (*v as usize) >= nverts {
					return Err(P3MImportError::VertexIndex(*v));
				}
			}

			mesh.add_face(face);
		}

		for _ in 0..nverts {
			let mut position = buf.read_vec3_le()?;
			let weight = buf.read_f32::<LE>()?;
			let bone = buf.read_u8()?;

			let mut pad = [0; 3];
			buf.read_exact(&mut pad)?;

			let normal = buf.read_vec3_le()?;
			let uv = buf.read_vec2_le()?;

			let group = resolve_binding(bone, npos, njoints)?;
			if let Some(j) = group {
				// bound positions are stored relative to the joint's head
				position = position + remap(skeleton.bones[j].head);
			}

			mesh.add_vertex(Vertex {
				position: remap(position),
				normal: remap(normal),
				uv: Vec2::new(uv.x, 1.0 - uv.y),
				group: group,
				weight: weight,
			});
		}

		Ok(Model {
			skeleton: skeleton,
			mesh: mesh,
			texture_name: texture_name,
		})
	}

	#[cfg(feature = "export")]
	pub fn write<W>(&self, buf: &mut W) -> Result<(), P3MExportError>
	where
		W: WriteBytesExt,
	{
		let (positions, joints) = skel::encode(&self.skeleton)?;

		buf.write_str_fixed(MAGIC, MAGIC_LEN)?;
		buf.write_u8(positions.len() as u8)?;
		buf.write_u8(joints.len() as u8)?;

		for pos in positions.iter() {
			pos.write(buf)?;
		}

		for joint in joints.iter() {
			joint.write(buf)?;
		}

		let verts = self.mesh.vertices();
		let faces = self.mesh.faces();

		if verts.len() > u16::MAX as usize {
			return Err(P3MExportError::VertexCount(verts.len()));
		}

		if faces.len() > u16::MAX as usize {
			return Err(P3MExportError::FaceCount(faces.len()));
		}

		buf.write_u16::<LE>(verts.len() as u16)?;
		buf.write_u16::<LE>(faces.len() as u16)?;
		buf.write_str_fixed(self.texture_name.as_str(), TEXTURE_NAME_LEN)?;

		for face in faces.iter() {
			for v in face.iter() {
				buf.write_u16::<LE>(*v)?;
			}
		}

		for (i, vert) in verts.iter().enumerate() {
			let mut position = vert.position;

			let index = match vert.group {
				Some(g) => {
					if g >= joints.len() {
						return Err(P3MExportError::GroupIndex(i, g));
					}

					let combined = g + positions.len();
					if combined >= SENTINEL as usize {
						return Err(P3MExportError::BindingOverflow(i, combined));
					}

					position = position - self.skeleton.bones[g].head;
					combined as u8
				},
				None => SENTINEL,
			};

			buf.write_vec3_le(remap(position))?;
			buf.write_f32::<LE>(vert.weight)?;
			buf.write_u8(index)?;
			buf.write_zeros(3)?;
			buf.write_vec3_le(remap(vert.normal))?;
			buf.write_vec2_le(Vec2::new(vert.uv.x, 1.0 - vert.uv.y))?;
		}

		Ok(())
	}
}

/// Fails if fewer than `needed` bytes remain before the end of the buffer
#[cfg(feature = "import")]
fn check_remaining<R>(buf: &mut R, needed: u64) -> Result<(), P3MImportError>
where
	R: ReadBytesExt + Seek,
{
	let here = buf.stream_position()?;
	let end = buf.seek(SeekFrom::End(0))?;
	buf.seek(SeekFrom::Start(here))?;

	if end - here < needed {
		return Err(P3MImportError::CountOverflow {
			offset: here,
			needed: needed,
			remaining: end - here,
		});
	}

	Ok(())
}

#[cfg(feature = "import")]
pub mod import {
	use std::io;
	use thiserror::Error;

	use super::SENTINEL;

	#[derive(Debug, Error)]
	pub enum P3MImportError {
		#[error("Vertex bone index out of range: {0}")]
		BoneIndex(u8),
		#[error("Child index out of bounds: {0}")]
		ChildIndex(u8),
		#[error("Declared counts overrun the buffer at {offset:#x}: need {needed} bytes, {remaining} left")]
		CountOverflow {
			offset: u64,
			needed: u64,
			remaining: u64,
		},
		#[error("Joint {0} is attached more than once")]
		CyclicHierarchy(u8),
		#[error("I/O error")]
		IO {
			#[from]
			source: io::Error,
		},
		#[error("Not a P3M file: {0:?}")]
		Magic(String),
		#[error("Joint {0} is not anchored to any position node")]
		Unanchored(u8),
		#[error("Face vertex index out of bounds: {0}")]
		VertexIndex(u16),
	}

	/// Maps an on-disk combined bone index into a joint index.
	/// Values below the position count are reserved, the sentinel means
	/// the vertex is unbound.
	pub fn resolve_binding(index: u8, npos: usize, njoints: usize) -> Result<Option<usize>, P3MImportError> {
		if index == SENTINEL {
			return Ok(None);
		}

		let combined = index as usize;
		if combined < npos || combined - npos >= njoints {
			return Err(P3MImportError::BoneIndex(index));
		}

		Ok(Some(combined - npos))
	}
}

#[cfg(feature = "export")]
pub mod export {
	use std::io;
	use thiserror::Error;

	#[derive(Debug, Error)]
	pub enum P3MExportError {
		#[error("Vertex {0} binds past the combined index space: {1}")]
		BindingOverflow(usize, usize),
		#[error("Skeleton has {0} bones, the format stores at most 255")]
		BoneCount(usize),
		#[error("Bone {0} has {1} children, the format stores at most 10")]
		ChildCount(usize, usize),
		#[error("Mesh has {0} faces, the format stores at most 65535")]
		FaceCount(usize),
		#[error("Vertex {0} is bound to nonexistent group {1}")]
		GroupIndex(usize, usize),
		#[error("I/O error")]
		IO {
			#[from]
			source: io::Error,
		},
		#[error("Mesh has {0} vertices, the format stores at most 65535")]
		VertexCount(usize),
	}
}
