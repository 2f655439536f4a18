/// Unit-level tests against the public domain and storage API
///
/// Property tests for the schedule rules and the version history live here;
/// module-internal tests stay next to the code they cover.

mod domain_rules;
mod version_coverage;
