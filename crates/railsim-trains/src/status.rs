//! Status text shown next to each train.

use railsim_network::Network;
use railsim_types::{SegmentId, SegmentKind};

/// Describe where a train is from the segment its head carriage is on.
///
/// `None` (not yet placed) reads "Preparing". Segments that are not part of
/// the line proper fall back to their own name.
pub fn status_text(network: &Network, head: Option<SegmentId>) -> String {
    let Some(segment) = head.and_then(|id| network.segment(id).ok()) else {
        return String::from("Preparing");
    };

    let station_name = |id| network.station(id).ok().map(|s| s.name.clone());
    match segment.kind() {
        SegmentKind::DepotSpurOut => String::from("Entering system"),
        SegmentKind::DepotSpurIn | SegmentKind::DepotPlatform => String::from("Exiting system"),
        SegmentKind::Loop => format!("Going {}", segment.direction()),
        SegmentKind::Platform => segment
            .station()
            .and_then(station_name)
            .map_or_else(|| segment.name().to_owned(), |name| format!("At {name}")),
        SegmentKind::Mainline => segment
            .origin()
            .and_then(station_name)
            .map_or_else(|| segment.name().to_owned(), |name| format!("From {name}")),
        SegmentKind::Generic => segment.name().to_owned(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use railsim_network::{LineLayout, build_line};
    use railsim_types::Direction;

    use super::*;

    #[test]
    fn describes_each_kind_of_track() {
        let layout: LineLayout = serde_yml::from_str(
            r"
name: Status
stations:
  - { name: Alpha, sequence: 1 }
  - { name: Bravo, sequence: 2, distance_to_previous: 900 }
",
        )
        .unwrap();
        let network = build_line(&layout).unwrap();
        let depot = *network.depot().unwrap();
        let find = |kind: SegmentKind, direction: Direction| {
            network
                .segments()
                .find(|s| s.kind() == kind && s.direction() == direction)
                .map(railsim_network::Segment::id)
        };

        assert_eq!(status_text(&network, None), "Preparing");
        assert_eq!(status_text(&network, Some(depot.spur_out)), "Entering system");
        assert_eq!(status_text(&network, Some(depot.spur_in)), "Exiting system");
        assert_eq!(status_text(&network, Some(depot.platform)), "Exiting system");
        assert_eq!(
            status_text(&network, find(SegmentKind::Platform, Direction::Northbound)),
            "At Alpha"
        );
        assert_eq!(
            status_text(&network, find(SegmentKind::Mainline, Direction::Southbound)),
            "From Bravo"
        );
        assert_eq!(
            status_text(&network, find(SegmentKind::Loop, Direction::Northbound)),
            "Going northbound"
        );
    }
}
