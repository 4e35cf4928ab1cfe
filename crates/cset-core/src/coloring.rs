/// A coloring of every table of an instance: `colors[t][i]` is the color of
/// element `i` of table `t`. Colors are dense within each table — every
/// value in `0..num_colors(t)` appears at least once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coloring {
    colors: Vec<Vec<u32>>,
}

impl Coloring {
    pub fn new(colors: Vec<Vec<u32>>) -> Self {
        Coloring { colors }
    }

    /// The uniform coloring (every element of every table colored `0`),
    /// the default starting point for color refinement.
    pub fn uniform(sizes: &[usize]) -> Self {
        Coloring {
            colors: sizes.iter().map(|&n| vec![0u32; n]).collect(),
        }
    }

    pub fn table_count(&self) -> usize {
        self.colors.len()
    }

    pub fn table(&self, t: usize) -> &[u32] {
        &self.colors[t]
    }

    pub fn table_mut(&mut self, t: usize) -> &mut [u32] {
        &mut self.colors[t]
    }

    pub fn color(&self, t: usize, i: usize) -> u32 {
        self.colors[t][i]
    }

    /// The number of distinct colors used in table `t`. Colors are dense,
    /// so this is `max(C[t]) + 1`.
    pub fn num_colors(&self, t: usize) -> u32 {
        self.colors[t].iter().copied().max().map_or(0, |m| m + 1)
    }

    /// `Σ_t num_colors(t)`, the fixed-point quantity color refinement
    /// monitors for convergence.
    pub fn total_colors(&self) -> u32 {
        self.colors.iter().enumerate().map(|(t, _)| self.num_colors(t)).sum()
    }

    /// True iff every color class of every table is a singleton: the
    /// coloring encodes a permutation on each table.
    pub fn is_discrete(&self) -> bool {
        self.colors.iter().enumerate().all(|(t, _)| self.num_colors(t) as usize == self.colors[t].len())
    }

    /// Color classes of table `t`, smallest index first within each class,
    /// ordered by color value.
    pub fn classes(&self, t: usize) -> Vec<Vec<usize>> {
        let mut classes = vec![Vec::new(); self.num_colors(t) as usize];
        for (i, &c) in self.colors[t].iter().enumerate() {
            classes[c as usize].push(i);
        }
        classes
    }

    /// Assigns element `i` of table `t` a fresh color strictly greater than
    /// every color currently used in that table, breaking it out of its
    /// class (individualization, spec §4.4 step 6).
    pub fn individualize(&mut self, t: usize, i: usize) {
        let fresh = self.num_colors(t);
        self.colors[t][i] = fresh;
    }

    /// Interprets a fully discrete coloring of table `t` as the
    /// permutation sending each element to its color (spec §3: "such a
    /// coloring encodes a permutation on each table").
    pub fn as_permutation_table(&self, t: usize) -> Vec<usize> {
        self.colors[t].iter().map(|&c| c as usize).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_coloring_has_one_color_per_table() {
        let c = Coloring::uniform(&[3, 2]);
        assert_eq!(c.num_colors(0), 1);
        assert_eq!(c.num_colors(1), 1);
        assert!(!c.is_discrete());
    }

    #[test]
    fn individualize_breaks_out_of_the_class() {
        let mut c = Coloring::uniform(&[3]);
        c.individualize(0, 1);
        assert_eq!(c.table(0), &[0, 1, 0]);
        assert_eq!(c.num_colors(0), 2);
    }

    #[test]
    fn discrete_coloring_is_a_permutation() {
        let c = Coloring::new(vec![vec![2, 0, 1]]);
        assert!(c.is_discrete());
        assert_eq!(c.as_permutation_table(0), vec![2, 0, 1]);
    }
}
