use mip_wire::MAX_COST;

const MAX_NODES: usize = 256;

/// One way of reaching a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    pub next_hop: u8,
    pub cost: u8,
    pub valid: bool,
}

impl RouteEntry {
    /// What [`RoutingTable::find_fastest_route`] yields when it knows
    /// nothing useful: unreachable and invalid.
    const NONE: RouteEntry = RouteEntry {
        next_hop: 0,
        cost: MAX_COST,
        valid: false,
    };
}

/// The distance-vector routing table.
///
/// Per destination, one entry per known next hop. A cost of [`MAX_COST`]
/// encodes "unreachable"; such entries are kept (so a recovering neighbour
/// can revalidate them) and only deleted when an UPDATE explicitly reports
/// the destination as unreachable via that hop.
pub struct RoutingTable {
    destinations: [Vec<RouteEntry>; MAX_NODES],
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self {
            destinations: std::array::from_fn(|_| Vec::new()),
        }
    }
}

impl RoutingTable {
    /// Inserts the route or, if an entry via `next_hop` already exists,
    /// overwrites its cost and revalidates it.
    pub fn add_update_route(&mut self, dest: u8, next_hop: u8, cost: u8) {
        let entries = &mut self.destinations[dest as usize];

        match entries.iter_mut().find(|e| e.next_hop == next_hop) {
            Some(entry) => {
                entry.cost = cost;
                entry.valid = true;
            }
            None => entries.push(RouteEntry {
                next_hop,
                cost,
                valid: true,
            }),
        }
    }

    pub fn route_exists(&self, dest: u8, next_hop: u8) -> bool {
        self.destinations[dest as usize]
            .iter()
            .any(|e| e.next_hop == next_hop)
    }

    pub fn delete_route(&mut self, dest: u8, next_hop: u8) {
        self.destinations[dest as usize].retain(|e| e.next_hop != next_hop);
    }

    /// Marks every route through `next_hop` as unreachable, across all
    /// destinations. Entries are kept, not deleted.
    pub fn set_hop_unreachable(&mut self, next_hop: u8) {
        for entries in &mut self.destinations {
            for entry in entries.iter_mut().filter(|e| e.next_hop == next_hop) {
                entry.cost = MAX_COST;
            }
        }
    }

    /// The lowest-cost valid route to `dest`, or the unreachable sentinel.
    pub fn find_fastest_route(&self, dest: u8) -> RouteEntry {
        self.destinations[dest as usize]
            .iter()
            .filter(|e| e.valid && e.cost < MAX_COST)
            .min_by_key(|e| e.cost)
            .copied()
            .unwrap_or(RouteEntry::NONE)
    }

    /// Best cost per destination.
    pub fn fastest_costs(&self) -> [u8; MAX_NODES] {
        std::array::from_fn(|dest| self.find_fastest_route(dest as u8).cost)
    }

    /// Best cost per destination as advertised to `neighbour`: any
    /// destination currently routed through `neighbour` is reported as
    /// unreachable (poisoned reverse).
    pub fn fastest_costs_for_neighbour(&self, neighbour: u8) -> [u8; MAX_NODES] {
        std::array::from_fn(|dest| {
            let fastest = self.find_fastest_route(dest as u8);

            if fastest.valid && fastest.next_hop == neighbour {
                MAX_COST
            } else {
                fastest.cost
            }
        })
    }

    /// All current neighbours, i.e. destinations with best cost 1.
    pub fn neighbours(&self) -> Vec<u8> {
        (0..MAX_NODES)
            .filter(|&node| self.find_fastest_route(node as u8).cost == 1)
            .map(|node| node as u8)
            .collect()
    }
}
