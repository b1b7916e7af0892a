//! Country → state → city selection.
//!
//! The reference table is static and synchronous. Every mutation funnels
//! through [`LocationSelection::apply`], which cascades downstream resets
//! in the same step, so a state can never be observed that disagrees with
//! its country, nor a city with its state.

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Field};

/// Synchronous lookup of the location reference data.
pub trait LocationDirectory: Send + Sync {
    /// `(code, name)` pairs, e.g. `("IN", "India")`.
    fn countries(&self) -> Vec<(String, String)>;
    /// `(code, name)` pairs for the states of `country`.
    fn states_of(&self, country: &str) -> Vec<(String, String)>;
    /// City names for `(country, state)`.
    fn cities_of(&self, country: &str, state: &str) -> Vec<String>;
}

struct StateRecord {
    code: &'static str,
    name: &'static str,
    cities: &'static [&'static str],
}

struct CountryRecord {
    code: &'static str,
    name: &'static str,
    states: &'static [StateRecord],
}

static COUNTRIES: &[CountryRecord] = &[
    CountryRecord {
        code: "IN",
        name: "India",
        states: &[
            StateRecord {
                code: "MH",
                name: "Maharashtra",
                cities: &["Mumbai", "Pune", "Nagpur", "Nashik"],
            },
            StateRecord {
                code: "KA",
                name: "Karnataka",
                cities: &["Bengaluru", "Mysuru", "Hubballi"],
            },
            StateRecord {
                code: "DL",
                name: "Delhi",
                cities: &["New Delhi"],
            },
            StateRecord {
                code: "GJ",
                name: "Gujarat",
                cities: &["Ahmedabad", "Surat", "Vadodara"],
            },
            StateRecord {
                code: "TN",
                name: "Tamil Nadu",
                cities: &["Chennai", "Coimbatore"],
            },
        ],
    },
    CountryRecord {
        code: "US",
        name: "United States",
        states: &[
            StateRecord {
                code: "CA",
                name: "California",
                cities: &["Los Angeles", "San Francisco", "San Diego"],
            },
            StateRecord {
                code: "NY",
                name: "New York",
                cities: &["New York", "Buffalo"],
            },
            StateRecord {
                code: "TX",
                name: "Texas",
                cities: &["Austin", "Dallas", "Houston"],
            },
        ],
    },
    CountryRecord {
        code: "AE",
        name: "United Arab Emirates",
        states: &[
            StateRecord {
                code: "DU",
                name: "Dubai",
                cities: &["Dubai"],
            },
            StateRecord {
                code: "AZ",
                name: "Abu Dhabi",
                cities: &["Abu Dhabi", "Al Ain"],
            },
        ],
    },
];

/// The embedded reference dataset.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticLocations;

impl StaticLocations {
    fn country(&self, code: &str) -> Option<&'static CountryRecord> {
        COUNTRIES.iter().find(|c| c.code == code)
    }

    fn state(&self, country: &str, state: &str) -> Option<&'static StateRecord> {
        self.country(country)?.states.iter().find(|s| s.code == state)
    }
}

impl LocationDirectory for StaticLocations {
    fn countries(&self) -> Vec<(String, String)> {
        COUNTRIES
            .iter()
            .map(|c| (c.code.to_string(), c.name.to_string()))
            .collect()
    }

    fn states_of(&self, country: &str) -> Vec<(String, String)> {
        self.country(country)
            .map(|c| {
                c.states
                    .iter()
                    .map(|s| (s.code.to_string(), s.name.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn cities_of(&self, country: &str, state: &str) -> Vec<String> {
        self.state(country, state)
            .map(|s| s.cities.iter().map(|c| (*c).to_string()).collect())
            .unwrap_or_default()
    }
}

/// One mutation of a [`LocationSelection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationChange {
    Country(String),
    State(String),
    City(String),
}

/// A country/state/city triple. Downstream fields are always members of
/// their upstream's set, or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSelection {
    pub country: String,
    pub state: String,
    pub city: String,
}

impl LocationSelection {
    /// Apply one change atomically, cascading resets downstream.
    ///
    /// Setting a country or clearing a field always succeeds; a state or
    /// city that is not a member of its upstream's set is silently dropped
    /// (the UI only offers values from the directory). Re-selecting the
    /// current state still clears the city.
    pub fn apply(&mut self, change: LocationChange, directory: &dyn LocationDirectory) {
        match change {
            LocationChange::Country(code) => {
                if !code.is_empty()
                    && !directory.countries().iter().any(|(c, _)| *c == code)
                {
                    return;
                }
                self.country = code;
                self.state.clear();
                self.city.clear();
            }
            LocationChange::State(code) => {
                if !code.is_empty()
                    && !directory
                        .states_of(&self.country)
                        .iter()
                        .any(|(c, _)| *c == code)
                {
                    return;
                }
                self.state = code;
                self.city.clear();
            }
            LocationChange::City(name) => {
                if !name.is_empty()
                    && !directory
                        .cities_of(&self.country, &self.state)
                        .iter()
                        .any(|c| *c == name)
                {
                    return;
                }
                self.city = name;
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.country.is_empty() && !self.state.is_empty() && !self.city.is_empty()
    }

    /// Display string `"city, state, country"`, available once all three
    /// fields are set.
    pub fn composed(&self) -> Result<String, AuthError> {
        if !self.is_complete() {
            return Err(AuthError::validation(
                Field::Location,
                "Please select country, state, and city",
            ));
        }
        Ok(format!("{}, {}, {}", self.city, self.state, self.country))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(changes: &[LocationChange]) -> LocationSelection {
        let directory = StaticLocations;
        let mut selection = LocationSelection::default();
        for change in changes {
            selection.apply(change.clone(), &directory);
        }
        selection
    }

    #[test]
    fn test_full_selection_composes() {
        let selection = select(&[
            LocationChange::Country("IN".into()),
            LocationChange::State("MH".into()),
            LocationChange::City("Mumbai".into()),
        ]);
        assert_eq!(selection.composed().unwrap(), "Mumbai, MH, IN");
    }

    #[test]
    fn test_country_change_resets_downstream() {
        let mut selection = select(&[
            LocationChange::Country("IN".into()),
            LocationChange::State("MH".into()),
            LocationChange::City("Mumbai".into()),
        ]);
        selection.apply(LocationChange::Country("US".into()), &StaticLocations);
        assert_eq!(selection.country, "US");
        assert_eq!(selection.state, "");
        assert_eq!(selection.city, "");
    }

    #[test]
    fn test_state_change_resets_city_even_when_reselected() {
        let mut selection = select(&[
            LocationChange::Country("IN".into()),
            LocationChange::State("MH".into()),
            LocationChange::City("Pune".into()),
        ]);
        selection.apply(LocationChange::State("MH".into()), &StaticLocations);
        assert_eq!(selection.state, "MH");
        assert_eq!(selection.city, "");
    }

    #[test]
    fn test_unknown_members_are_dropped() {
        let mut selection = select(&[LocationChange::Country("IN".into())]);
        selection.apply(LocationChange::State("CA".into()), &StaticLocations);
        assert_eq!(selection.state, "");

        selection.apply(LocationChange::State("KA".into()), &StaticLocations);
        selection.apply(LocationChange::City("Mumbai".into()), &StaticLocations);
        assert_eq!(selection.city, "");
    }

    #[test]
    fn test_clearing_fields() {
        let mut selection = select(&[
            LocationChange::Country("IN".into()),
            LocationChange::State("KA".into()),
            LocationChange::City("Mysuru".into()),
        ]);
        selection.apply(LocationChange::State(String::new()), &StaticLocations);
        assert_eq!(selection.state, "");
        assert_eq!(selection.city, "");
        assert!(selection.composed().is_err());
    }

    #[test]
    fn test_directory_lookups() {
        let directory = StaticLocations;
        assert!(directory.countries().iter().any(|(c, _)| c == "IN"));
        assert!(directory
            .states_of("IN")
            .iter()
            .any(|(c, n)| c == "MH" && n == "Maharashtra"));
        assert!(directory.cities_of("IN", "MH").contains(&"Mumbai".to_string()));
        assert!(directory.states_of("ZZ").is_empty());
        assert!(directory.cities_of("IN", "ZZ").is_empty());
    }
}
