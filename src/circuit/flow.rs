//! Material flows between circuit nodes.

use super::types::{FlowId, FlowSlot};

/// A stream of material in transit between nodes.
///
/// `fine` and `grade` describe the same quantity through `mass`, but they are
/// not kept in sync automatically. After changing `mass` together with one of
/// them, call the matching `derive_*` method.
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    /// Flow identifier
    pub id: FlowId,
    /// Display name
    pub name: String,
    /// Mass rate (t/h or any unit consistent across the circuit)
    pub mass: f64,
    /// Grade of the valuable component (% of mass)
    pub grade: f64,
    /// Fine content (mass * grade / 100)
    pub fine: f64,
}

impl Flow {
    /// Create an empty flow.
    pub fn new(id: FlowId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            mass: 0.0,
            grade: 0.0,
            fine: 0.0,
        }
    }

    /// Set mass and grade, then derive the fine content.
    pub fn set_mass_grade(&mut self, mass: f64, grade: f64) {
        self.mass = mass;
        self.grade = grade;
        self.derive_fine_from_mass_grade();
    }

    /// Recompute `fine` from `mass` and `grade`.
    pub fn derive_fine_from_mass_grade(&mut self) {
        self.fine = self.mass * self.grade / 100.0;
    }

    /// Recompute `grade` from `mass` and `fine`.
    /// A massless flow has grade 0.
    pub fn derive_grade_from_mass_fine(&mut self) {
        self.grade = if self.mass == 0.0 {
            0.0
        } else {
            self.fine / self.mass * 100.0
        };
    }
}

/// Flat arena of flows, ordered by id.
///
/// Cloning copies the value buffer only, so a clone never aliases the
/// original.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowTable {
    flows: Vec<Flow>,
}

impl FlowTable {
    /// Build a table from flows in any order. Duplicate ids keep the first entry.
    pub fn from_flows(mut flows: Vec<Flow>) -> Self {
        flows.sort_by_key(|f| f.id);
        flows.dedup_by_key(|f| f.id);
        Self { flows }
    }

    /// Number of flows.
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    /// True if the table holds no flows.
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Look up the arena slot of a flow id.
    pub fn slot(&self, id: FlowId) -> Option<FlowSlot> {
        self.flows.binary_search_by_key(&id, |f| f.id).ok().map(FlowSlot)
    }

    /// Get a flow by slot.
    pub fn get(&self, slot: FlowSlot) -> &Flow {
        &self.flows[slot.0]
    }

    /// Get a mutable flow by slot.
    pub fn get_mut(&mut self, slot: FlowSlot) -> &mut Flow {
        &mut self.flows[slot.0]
    }

    /// Get a flow by id.
    pub fn by_id(&self, id: FlowId) -> Option<&Flow> {
        self.slot(id).map(|s| self.get(s))
    }

    /// Get a mutable flow by id.
    pub fn by_id_mut(&mut self, id: FlowId) -> Option<&mut Flow> {
        self.slot(id).map(move |s| self.get_mut(s))
    }

    /// Iterate over all flows in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Flow> {
        self.flows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_derive_fine() {
        let mut f = Flow::new(FlowId(1), "feed");
        f.set_mass_grade(100.0, 1.5);
        assert_relative_eq!(f.fine, 1.5);
    }

    #[test]
    fn test_derive_grade() {
        let mut f = Flow::new(FlowId(2), "conc");
        f.mass = 10.0;
        f.fine = 1.125;
        f.derive_grade_from_mass_fine();
        assert_relative_eq!(f.grade, 11.25);
    }

    #[test]
    fn test_zero_mass_grade_is_zero() {
        let mut f = Flow::new(FlowId(3), "empty");
        f.fine = 4.0;
        f.derive_grade_from_mass_fine();
        assert_eq!(f.grade, 0.0);
    }

    #[test]
    fn test_fields_not_synchronized_until_derived() {
        let mut f = Flow::new(FlowId(4), "stale");
        f.set_mass_grade(50.0, 2.0);
        f.mass = 100.0;
        // fine still reflects the old mass
        assert_relative_eq!(f.fine, 1.0);
        f.derive_fine_from_mass_grade();
        assert_relative_eq!(f.fine, 2.0);
    }

    #[test]
    fn test_table_orders_by_id() {
        let table = FlowTable::from_flows(vec![
            Flow::new(FlowId(9), "c"),
            Flow::new(FlowId(2), "a"),
            Flow::new(FlowId(5), "b"),
        ]);
        let ids: Vec<u32> = table.iter().map(|f| f.id.0).collect();
        assert_eq!(ids, vec![2, 5, 9]);
        assert_eq!(table.slot(FlowId(5)), Some(FlowSlot(1)));
        assert_eq!(table.slot(FlowId(7)), None);
    }
}
