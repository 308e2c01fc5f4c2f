use std::collections::VecDeque;

/// Fixed-capacity buffer that drops the oldest sample once full.
#[derive(Clone, Debug)]
pub struct RollingHistory<T> {
	samples: VecDeque<T>,
	capacity: usize,
}

impl<T> RollingHistory<T> {
	pub fn new(capacity: usize) -> Self {
		let capacity = capacity.max(1);
		Self {
			samples: VecDeque::with_capacity(capacity),
			capacity,
		}
	}

	pub fn push(&mut self, sample: T) {
		if self.samples.len() == self.capacity {
			self.samples.pop_front();
		}
		self.samples.push_back(sample);
	}

	pub fn latest(&self) -> Option<&T> {
		self.samples.back()
	}

	pub fn iter(&self) -> impl Iterator<Item = &T> {
		self.samples.iter()
	}

	pub fn clear(&mut self) {
		self.samples.clear();
	}
}

impl<T: Clone> RollingHistory<T> {
	pub fn to_vec(&self) -> Vec<T> {
		self.samples.iter().cloned().collect()
	}
}
