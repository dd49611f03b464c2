//! Synthetic RSVP entries
//!
//! Every entry is generated independently from a fixed vocabulary, so the
//! generator can be called from any worker without coordination.

use chrono::{Duration, Local};
use rand::Rng;
use serde::{Deserialize, Serialize};

const WARD_NAMES: [&str; 12] = [
    "Kathmandu Ward 1",
    "Kathmandu Ward 2",
    "Kathmandu Ward 3",
    "Kathmandu Ward 4",
    "Lalitpur Ward 1",
    "Lalitpur Ward 2",
    "Bhaktapur Ward 1",
    "Bhaktapur Ward 2",
    "Kirtipur Ward 1",
    "Kirtipur Ward 2",
    "Madhyapur Ward 1",
    "Madhyapur Ward 2",
];

const PARTICIPANT_NAMES: [&str; 16] = [
    "Ram Sharma",
    "Sita Poudel",
    "Krishna Adhikari",
    "Gita Maharjan",
    "Hari Shrestha",
    "Maya Tamang",
    "Suresh Gurung",
    "Kamala Rai",
    "Bikash Thapa",
    "Sunita Magar",
    "Dipak Singh",
    "Rashmi Khatri",
    "Anil Joshi",
    "Pramila Bhatta",
    "Rajesh Pandey",
    "Sangita Kafle",
];

const RELATIONS: [&str; 9] = [
    "Father",
    "Mother",
    "Guardian",
    "Uncle",
    "Aunt",
    "Grandfather",
    "Grandmother",
    "Brother",
    "Sister",
];

/// Submissions are back-dated by up to one day
const MAX_AGE_MINUTES: i64 = 1440;

/// Ward class
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WardClass {
    A,
    B,
    C,
    D,
}

impl WardClass {
    pub const ALL: [WardClass; 4] = [WardClass::A, WardClass::B, WardClass::C, WardClass::D];
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub name: String,
    pub relation_to_student: String,
}

/// One RSVP form submission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestPayload {
    pub timestamp: String,
    pub ward_name: String,
    pub ward_class: WardClass,
    pub number_of_participants: u8,
    pub email: String,
    pub phone: String,
    pub participants: Vec<Participant>,
}

fn pick<R: Rng + ?Sized>(rng: &mut R, items: &[&str]) -> String {
    items[rng.gen_range(0..items.len())].to_string()
}

/// Generate the payload for `entry_number` using the thread-local RNG
pub fn generate(entry_number: usize) -> TestPayload {
    generate_with(entry_number, &mut rand::thread_rng())
}

/// Generate the payload for `entry_number` from the given random source
pub fn generate_with<R: Rng + ?Sized>(entry_number: usize, rng: &mut R) -> TestPayload {
    let age = Duration::minutes(rng.gen_range(1..=MAX_AGE_MINUTES));
    let timestamp = (Local::now() - age)
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string();

    let number_of_participants: u8 = rng.gen_range(1..=2);
    let participants = (0..number_of_participants)
        .map(|_| Participant {
            name: pick(rng, &PARTICIPANT_NAMES),
            relation_to_student: pick(rng, &RELATIONS),
        })
        .collect();

    TestPayload {
        timestamp,
        ward_name: pick(rng, &WARD_NAMES),
        ward_class: WardClass::ALL[rng.gen_range(0..WardClass::ALL.len())],
        number_of_participants,
        email: format!("test{}@example.com", entry_number),
        // Nepal mobile format
        phone: format!("98{}", rng.gen_range(10_000_000..=99_999_999)),
        participants,
    }
}
