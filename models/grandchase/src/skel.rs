use std::io;

use ultraviolet::vec::Vec3;

#[cfg(feature = "import")]
use gck_core::io_ext::ReadBinExt;

#[cfg(feature = "export")]
use gck_core::io_ext::WriteBinExt;

#[cfg(feature = "import")]
use std::collections::VecDeque;

#[cfg(feature = "import")]
use gck_core::scene::{
	Bone,
	Skeleton
};

#[cfg(feature = "export")]
use gck_core::scene::SkeletonSource;

#[cfg(feature = "import")]
use crate::p3m::import::P3MImportError;

#[cfg(feature = "export")]
use crate::p3m::export::P3MExportError;

/// Reserved index meaning "no child" in a slot list, or "no bone" in a
/// vertex binding
pub const SENTINEL: u8 = 255;

/// Fixed number of child slots in every position/joint record
pub const CHILD_SLOTS: usize = 10;

/// Length of the synthetic tail given to leaf and branch joints
pub const TAIL_LEN: f32 = 0.05;

/// On-disk size of a position record
pub const POSITION_LEN: usize = 24;

/// On-disk size of a joint record
pub const JOINT_LEN: usize = 28;

/// Spatial anchor record. Holds an offset relative to the anchor chain
/// parent (absolute for roots) and the joints hanging from this anchor.
/// Unused child slots carry the sentinel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionNode {
	pub offset: Vec3,
	pub child_joints: [u8; CHILD_SLOTS],
}

/// Articulated bone record. The sixteen leading bytes of the record are
/// reserved and ignored, only the child position list matters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointNode {
	pub child_positions: [u8; CHILD_SLOTS],
}

impl PositionNode {
	#[cfg(feature = "import")]
	pub fn read<R>(buf: &mut R) -> Result<PositionNode, P3MImportError>
	where
		R: io::Read,
	{
		let offset = buf.read_vec3_le()?;

		let mut child_joints = [0; CHILD_SLOTS];
		buf.read_exact(&mut child_joints)?;

		let mut pad = [0; 2];
		buf.read_exact(&mut pad)?;

		Ok(PositionNode {
			offset: offset,
			child_joints: child_joints,
		})
	}

	#[cfg(feature = "export")]
	pub fn write<W>(&self, buf: &mut W) -> io::Result<()>
	where
		W: io::Write,
	{
		buf.write_vec3_le(self.offset)?;
		buf.write_all(&self.child_joints)?;

		// the stock encoder pads position records with FF, not zero
		buf.write_all(&[0xFF; 2])
	}
}

impl JointNode {
	#[cfg(feature = "import")]
	pub fn read<R>(buf: &mut R) -> Result<JointNode, P3MImportError>
	where
		R: io::Read,
	{
		let mut reserved = [0; 16];
		buf.read_exact(&mut reserved)?;

		let mut child_positions = [0; CHILD_SLOTS];
		buf.read_exact(&mut child_positions)?;

		let mut pad = [0; 2];
		buf.read_exact(&mut pad)?;

		Ok(JointNode {
			child_positions: child_positions,
		})
	}

	#[cfg(feature = "export")]
	pub fn write<W>(&self, buf: &mut W) -> io::Result<()>
	where
		W: io::Write,
	{
		buf.write_all(&[0xFF; 16])?;
		buf.write_all(&self.child_positions)?;
		buf.write_zeros(2)
	}
}

/// Converts a vector between the Z-up editor space and the Y-up file space.
/// Swaps Y and Z and negates X, except that an X of zero stays zero so no
/// `-0.0` ever reaches the file. The mapping is its own inverse.
pub fn remap(v: Vec3) -> Vec3 {
	let x = if v.x == 0.0 {
		0.0
	} else {
		-v.x
	};

	Vec3::new(x, v.z, v.y)
}

/// Scales a direction to tail length, leaving zero vectors untouched
#[cfg(feature = "import")]
fn scale_dir(v: Vec3) -> Vec3 {
	let mag = v.mag();

	if mag == 0.0 {
		Vec3::zero()
	} else {
		v * (TAIL_LEN / mag)
	}
}

/// Flattens the position/joint dual arrays into a single rooted skeleton.
///
/// A joint's children are found by a two-hop walk: follow its child
/// positions outward to the joints anchored at those positions. Several
/// joints may branch from one shared anchor (fingers from a wrist) without
/// duplicating its coordinates. Heads accumulate root-to-leaf, then the
/// whole skeleton is remapped into editor space.
#[cfg(feature = "import")]
pub fn decode(positions: &[PositionNode], joints: &[JointNode]) -> Result<Skeleton, P3MImportError> {
	let njoints = joints.len();

	// anchor pass: each joint takes its stored offset from the position
	// that lists it
	let mut offsets = vec![None; njoints];
	for pos in positions.iter() {
		for j in pos.child_joints.iter() {
			if *j == SENTINEL {
				continue;
			}

			if (*j as usize) >= njoints {
				return Err(P3MImportError::ChildIndex(*j));
			}

			offsets[*j as usize] = Some(pos.offset);
		}
	}

	// child sets by the two-hop indirection
	let mut children: Vec<Vec<usize>> = vec![vec![]; njoints];
	let mut referenced = vec![false; njoints];

	for (j, joint) in joints.iter().enumerate() {
		for p in joint.child_positions.iter() {
			if *p == SENTINEL {
				continue;
			}

			if (*p as usize) >= positions.len() {
				return Err(P3MImportError::ChildIndex(*p));
			}

			for a in positions[*p as usize].child_joints.iter() {
				if *a != SENTINEL {
					children[j].push(*a as usize);
					referenced[*a as usize] = true;
				}
			}
		}
	}

	let mut parents = vec![None; njoints];
	let mut heads = vec![Vec3::zero(); njoints];
	let mut tails = vec![Vec3::zero(); njoints];
	let mut attached = vec![false; njoints];
	let mut queue = VecDeque::new();

	// roots are joints that no child set mentions
	for j in 0..njoints {
		if !referenced[j] {
			heads[j] = offsets[j].ok_or(P3MImportError::Unanchored(j as u8))?;
			attached[j] = true;
			queue.push_back(j);
		}
	}

	while let Some(j) = queue.pop_front() {
		if children[j].len() != 1 {
			// leaves and branch points get a small visible extension
			let v = match parents[j] {
				Some(p) => scale_dir(tails[p] - heads[p]),
				None => Vec3::new(0.0, TAIL_LEN, 0.0),
			};

			tails[j] = heads[j] + v;
		} else {
			tails[j] = heads[j];
		}

		for i in 0..children[j].len() {
			let c = children[j][i];

			if attached[c] {
				return Err(P3MImportError::CyclicHierarchy(c as u8));
			}

			attached[c] = true;
			parents[c] = Some(j);

			// stored offsets are relative to the direct chain parent
			heads[c] = heads[j] + offsets[c].ok_or(P3MImportError::Unanchored(c as u8))?;

			if children[j].len() == 1 {
				// single-child chains point straight at the child
				tails[j] = heads[c];
			}

			queue.push_back(c);
		}
	}

	// anything still detached sits on a loop no root can reach
	if let Some(stray) = attached.iter().position(|a| !*a) {
		return Err(P3MImportError::CyclicHierarchy(stray as u8));
	}

	let mut bones = Vec::with_capacity(njoints);
	for j in 0..njoints {
		bones.push(Bone {
			parent: parents[j],
			children: children[j].clone(),
			head: remap(heads[j]),
			tail: remap(tails[j]),
		});
	}

	Ok(Skeleton {
		bones: bones,
	})
}

/// Expands a skeleton into parallel position/joint arrays, giving every
/// joint its own anchor. Stored offsets are taken against the parent's
/// absolute head and remapped into file space after the subtraction.
#[cfg(feature = "export")]
pub fn encode<S>(skel: &S) -> Result<(Vec<PositionNode>, Vec<JointNode>), P3MExportError>
where
	S: SkeletonSource,
{
	let bones = skel.bones();

	if bones.len() > SENTINEL as usize {
		return Err(P3MExportError::BoneCount(bones.len()));
	}

	let mut positions = Vec::with_capacity(bones.len());
	let mut joints = Vec::with_capacity(bones.len());

	for (i, bone) in bones.iter().enumerate() {
		let delta = match bone.parent {
			Some(p) => bone.head - bones[p].head,
			None => bone.head,
		};

		let mut child_joints = [SENTINEL; CHILD_SLOTS];
		child_joints[0] = i as u8;

		positions.push(PositionNode {
			offset: remap(delta),
			child_joints: child_joints,
		});

		if bone.children.len() > CHILD_SLOTS {
			return Err(P3MExportError::ChildCount(i, bone.children.len()));
		}

		let mut child_positions = [SENTINEL; CHILD_SLOTS];
		for (slot, c) in bone.children.iter().enumerate() {
			child_positions[slot] = *c as u8;
		}

		joints.push(JointNode {
			child_positions: child_positions,
		});
	}

	Ok((positions, joints))
}
