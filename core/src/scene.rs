use ultraviolet::vec::{
	Vec2,
	Vec3
};

/// A single bone with absolute head and tail positions.
/// Bones live in a flat arena and refer to each other by index,
/// the tree owns the forward (child) edges.
#[derive(Clone, Debug, PartialEq)]
pub struct Bone {
	pub parent: Option<usize>,
	pub children: Vec<usize>,
	pub head: Vec3,
	pub tail: Vec3,
}

/// A rooted bone tree in a flat, index-addressed arena
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Skeleton {
	pub bones: Vec<Bone>,
}

impl Skeleton {
	pub fn new() -> Skeleton {
		Skeleton {
			bones: vec![],
		}
	}

	/// Returns the indices of all bones without a parent
	pub fn roots(&self) -> Vec<usize> {
		self.bones.iter().enumerate()
			.filter(|(_, b)| b.parent.is_none())
			.map(|(i, _)| i)
			.collect()
	}
}

/// Ordered bone intake, the write half of the host boundary
pub trait SkeletonSink {
	/// Appends a bone and returns its index. The parent, if given,
	/// must already be present.
	fn add_bone(&mut self, head: Vec3, tail: Vec3, parent: Option<usize>) -> usize;
}

/// Ordered bone readout, the read half of the host boundary
pub trait SkeletonSource {
	fn bones(&self) -> &[Bone];
}

impl SkeletonSink for Skeleton {
	fn add_bone(&mut self, head: Vec3, tail: Vec3, parent: Option<usize>) -> usize {
		let id = self.bones.len();

		self.bones.push(Bone {
			parent: parent,
			children: vec![],
			head: head,
			tail: tail,
		});

		if let Some(p) = parent {
			self.bones[p].children.push(id);
		}

		id
	}
}

impl SkeletonSource for Skeleton {
	fn bones(&self) -> &[Bone] {
		self.bones.as_slice()
	}
}

/// A mesh vertex bound to at most one vertex group
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
	pub position: Vec3,
	pub normal: Vec3,
	pub uv: Vec2,
	pub group: Option<usize>,
	pub weight: f32,
}

/// A triangle as three vertex indices
pub type Face = [u16; 3];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
	pub vertices: Vec<Vertex>,
	pub faces: Vec<Face>,
}

impl Mesh {
	pub fn new() -> Mesh {
		Mesh {
			vertices: vec![],
			faces: vec![],
		}
	}
}

/// Mesh intake, the write half of the host boundary
pub trait MeshSink {
	fn add_vertex(&mut self, vertex: Vertex) -> usize;
	fn add_face(&mut self, face: Face);
}

/// Mesh readout, the read half of the host boundary
pub trait MeshSource {
	fn vertices(&self) -> &[Vertex];
	fn faces(&self) -> &[Face];
}

impl MeshSink for Mesh {
	fn add_vertex(&mut self, vertex: Vertex) -> usize {
		self.vertices.push(vertex);
		self.vertices.len() - 1
	}

	fn add_face(&mut self, face: Face) {
		self.faces.push(face);
	}
}

impl MeshSource for Mesh {
	fn vertices(&self) -> &[Vertex] {
		self.vertices.as_slice()
	}

	fn faces(&self) -> &[Face] {
		self.faces.as_slice()
	}
}

#[cfg(test)]
mod tests {
	use ultraviolet::vec::Vec3;

	use super::*;

	#[test]
	fn test_add_bone_links_children() {
		let mut skel = Skeleton::new();

		let root = skel.add_bone(Vec3::zero(), Vec3::new(0.0, 0.0, 1.0), None);
		let left = skel.add_bone(Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 1.0), Some(root));
		let right = skel.add_bone(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 1.0), Some(root));

		assert_eq!(skel.bones[root].children, vec![left, right]);
		assert_eq!(skel.bones[left].parent, Some(root));
		assert_eq!(skel.bones[right].parent, Some(root));
		assert_eq!(skel.roots(), vec![root]);
	}

	#[test]
	fn test_mesh_sink() {
		let mut mesh = Mesh::new();

		for i in 0..3 {
			let v = Vertex {
				position: Vec3::new(i as f32, 0.0, 0.0),
				normal: Vec3::new(0.0, 0.0, 1.0),
				uv: ultraviolet::vec::Vec2::zero(),
				group: None,
				weight: 0.0,
			};

			assert_eq!(mesh.add_vertex(v), i);
		}

		mesh.add_face([0, 1, 2]);
		assert_eq!(mesh.faces(), &[[0, 1, 2]]);
		assert_eq!(mesh.vertices().len(), 3);
	}
}
