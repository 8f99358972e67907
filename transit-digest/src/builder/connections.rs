//! Connection Decorator: qualifies raw connection codes with a direction.
//!
//! While building, stops carry bare agency codes of the lines they
//! connect with. Once every line is known, each code becomes the line id
//! of whichever direction of that line actually serves the stop.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::domain::{Direction, Line};

/// A connection code that could not be qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedConnection {
    pub line: String,
    pub stop: String,
    pub code: String,
}

/// Outcome of one decoration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionReport {
    pub resolved: usize,
    pub unresolved: Vec<UnresolvedConnection>,
}

/// Stop ids served by each line id.
type Membership = HashMap<String, HashSet<String>>;

fn membership(lines: &[Line]) -> Membership {
    lines
        .iter()
        .map(|l| (l.id.clone(), l.stops.iter().map(|s| s.id.clone()).collect()))
        .collect()
}

/// Qualify one code for a stop.
///
/// Forward is tried first, so it wins if the stop is served in both
/// directions. Codes that already name a serving line are kept as they are.
fn resolve(code: &str, stop_id: &str, membership: &Membership) -> Option<String> {
    if membership.get(code).is_some_and(|stops| stops.contains(stop_id)) {
        return Some(code.to_string());
    }
    for direction in Direction::ALL {
        let candidate = direction.line_id(code);
        match membership.get(&candidate) {
            None => debug!(line = %candidate, "connection line not mapped"),
            Some(stops) if stops.contains(stop_id) => return Some(candidate),
            Some(_) => {}
        }
    }
    None
}

/// Replace every stop's raw codes with direction-qualified line ids.
///
/// Codes that resolve to neither direction are dropped and reported.
pub fn decorate_connections(lines: &mut [Line]) -> ConnectionReport {
    let membership = membership(lines);
    let mut report = ConnectionReport::default();

    for line in lines.iter_mut() {
        for stop in &mut line.stops {
            if stop.connections.is_empty() {
                continue;
            }
            let mut resolved = Vec::with_capacity(stop.connections.len());
            for code in &stop.connections {
                match resolve(code, &stop.id, &membership) {
                    Some(id) => resolved.push(id),
                    None => {
                        warn!(line = %line.id, stop = %stop.id, code = %code, "unresolved connection");
                        report.unresolved.push(UnresolvedConnection {
                            line: line.id.clone(),
                            stop: stop.id.clone(),
                            code: code.clone(),
                        });
                    }
                }
            }
            report.resolved += resolved.len();
            stop.connections = resolved;
        }
    }

    info!(
        resolved = report.resolved,
        unresolved = report.unresolved.len(),
        "decorated connections"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Stop;

    fn line(agency: &str, direction: Direction, stops: &[(&str, &[&str])]) -> Line {
        let mut l = Line::new(agency, 1, "A - B", direction);
        for (id, connections) in stops {
            l.push_stop(
                Stop::new(*id, *id).with_connections(connections.iter().map(|c| c.to_string()).collect()),
                false,
            );
        }
        l
    }

    #[test]
    fn picks_the_direction_serving_the_stop() {
        let mut lines = vec![
            line("03", Direction::Forward, &[("10", &["46"]), ("11", &[])]),
            line("46", Direction::Forward, &[("10", &[])]),
            line("46", Direction::Backward, &[("20", &[])]),
        ];
        let report = decorate_connections(&mut lines);

        assert_eq!(lines[0].stops[0].connections, ["I46"]);
        assert_eq!(report.resolved, 1);
        assert!(report.unresolved.is_empty());
    }

    #[test]
    fn backward_when_only_backward_serves() {
        let mut lines = vec![
            line("03", Direction::Forward, &[("20", &["46"])]),
            line("46", Direction::Forward, &[("10", &[])]),
            line("46", Direction::Backward, &[("20", &[])]),
        ];
        decorate_connections(&mut lines);
        assert_eq!(lines[0].stops[0].connections, ["V46"]);
    }

    #[test]
    fn forward_wins_a_tie() {
        let mut lines = vec![
            line("03", Direction::Forward, &[("10", &["46"])]),
            line("46", Direction::Forward, &[("10", &[])]),
            line("46", Direction::Backward, &[("10", &[])]),
        ];
        decorate_connections(&mut lines);
        assert_eq!(lines[0].stops[0].connections, ["I46"]);
    }

    #[test]
    fn unresolved_codes_are_dropped_and_reported() {
        let mut lines = vec![
            line("03", Direction::Forward, &[("10", &["46", "99", "77"])]),
            line("46", Direction::Forward, &[("10", &[])]),
            line("77", Direction::Forward, &[("30", &[])]),
            line("77", Direction::Backward, &[("31", &[])]),
        ];
        let report = decorate_connections(&mut lines);

        assert_eq!(lines[0].stops[0].connections, ["I46"]);
        let codes: Vec<_> = report.unresolved.iter().map(|u| u.code.as_str()).collect();
        assert_eq!(codes, ["99", "77"]);
        assert_eq!(report.unresolved[0].line, "I03");
        assert_eq!(report.unresolved[0].stop, "10");
    }

    #[test]
    fn decorating_twice_changes_nothing() {
        let mut lines = vec![
            line("03", Direction::Forward, &[("10", &["46"])]),
            line("46", Direction::Backward, &[("10", &[])]),
        ];
        decorate_connections(&mut lines);
        let once = lines.clone();
        decorate_connections(&mut lines);
        assert_eq!(lines, once);
    }
}
