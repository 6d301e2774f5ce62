use ndarray::Array3;

/// Connected components of a binary volume.
#[derive(Clone, Debug)]
pub struct Labeling {
    /// 0 for background, `1..=count` for components, numbered in scan order.
    pub labels: Array3<u32>,
    pub count: usize,
}

impl Labeling {
    /// Mean of `values` over each component; index `c` holds label `c + 1`.
    pub fn component_means(&self, values: &Array3<f64>) -> Vec<f64> {
        let mut sums = vec![0.0; self.count];
        let mut areas = vec![0usize; self.count];
        for (&label, &value) in self.labels.iter().zip(values.iter()) {
            if label > 0 {
                sums[label as usize - 1] += value;
                areas[label as usize - 1] += 1;
            }
        }
        sums.iter()
            .zip(&areas)
            .map(|(&s, &a)| if a > 0 { s / a as f64 } else { f64::NAN })
            .collect()
    }

    /// Mask of a single component.
    pub fn component_mask(&self, label: u32) -> Array3<bool> {
        self.labels.mapv(|l| l == label)
    }
}

/// Two-pass labeling with union-find, using face connectivity (each voxel
/// touches its six axis neighbors).
pub fn label_components(mask: &Array3<bool>) -> Labeling {
    let (d0, d1, d2) = mask.dim();
    let mut labels = Array3::<u32>::zeros((d0, d1, d2));
    // Index 0 unused; labels start at 1.
    let mut parent: Vec<u32> = vec![0];

    // Pass 1: provisional labels from the already-visited neighbors.
    for i in 0..d0 {
        for j in 0..d1 {
            for k in 0..d2 {
                if !mask[[i, j, k]] {
                    continue;
                }
                let mut neighbors = [0u32; 3];
                if i > 0 {
                    neighbors[0] = labels[[i - 1, j, k]];
                }
                if j > 0 {
                    neighbors[1] = labels[[i, j - 1, k]];
                }
                if k > 0 {
                    neighbors[2] = labels[[i, j, k - 1]];
                }

                let smallest = neighbors.iter().copied().filter(|&l| l > 0).min();
                match smallest {
                    None => {
                        let label = parent.len() as u32;
                        parent.push(label);
                        labels[[i, j, k]] = label;
                    }
                    Some(smallest) => {
                        labels[[i, j, k]] = smallest;
                        for &other in neighbors.iter().filter(|&&l| l > 0 && l != smallest) {
                            union(&mut parent, smallest, other);
                        }
                    }
                }
            }
        }
    }

    // Pass 2: resolve roots and renumber densely in scan order.
    let mut compact = vec![0u32; parent.len()];
    let mut count = 0u32;
    for label in labels.iter_mut() {
        if *label == 0 {
            continue;
        }
        let root = find(&parent, *label) as usize;
        if compact[root] == 0 {
            count += 1;
            compact[root] = count;
        }
        *label = compact[root];
    }

    Labeling {
        labels,
        count: count as usize,
    }
}

fn find(parent: &[u32], mut x: u32) -> u32 {
    while parent[x as usize] != x {
        x = parent[x as usize];
    }
    x
}

fn union(parent: &mut [u32], a: u32, b: u32) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        let (small, big) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[big as usize] = small;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_separate_blobs() {
        let mut mask = Array3::from_elem((6, 6, 1), false);
        mask[[0, 0, 0]] = true;
        mask[[0, 1, 0]] = true;
        mask[[4, 4, 0]] = true;
        let labeling = label_components(&mask);
        assert_eq!(labeling.count, 2);
        assert_eq!(labeling.labels[[0, 0, 0]], labeling.labels[[0, 1, 0]]);
        assert_ne!(labeling.labels[[0, 0, 0]], labeling.labels[[4, 4, 0]]);
    }

    #[test]
    fn test_u_shape_merges() {
        // Two arms joined at the bottom row receive one label after pass 2.
        let mut mask = Array3::from_elem((3, 3, 1), false);
        for i in 0..3 {
            mask[[i, 0, 0]] = true;
            mask[[i, 2, 0]] = true;
        }
        mask[[2, 1, 0]] = true;
        let labeling = label_components(&mask);
        assert_eq!(labeling.count, 1);
    }

    #[test]
    fn test_diagonal_is_not_connected() {
        let mut mask = Array3::from_elem((2, 2, 2), false);
        mask[[0, 0, 0]] = true;
        mask[[1, 1, 1]] = true;
        assert_eq!(label_components(&mask).count, 2);
    }
}
