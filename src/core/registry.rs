use std::str::FromStr;
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::error::{LbError, LbResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Location {
    RockyPlateau,
    DeadwoodValley,
    CausticCaves,
    FungusForest,
    UndeadCrypt,
    BronzeMine,
    IcyRidge,
    Temple,
}

// Much older events do not have leaderboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Event {
    Spring,
    Summer,
    Hamartia,
    #[strum(serialize = "bolesh_2x")]
    Bolesh2x,
    Towering,
    AetherTalisman,
    Burnout,
    #[strum(serialize = "BFG_reheat")]
    BfgReheat,
    #[strum(serialize = "anniversary2024")]
    Anniversary2024,
}

impl Location {
    pub fn name(&self) -> &'static str {
        match self {
            Location::RockyPlateau => "Rocky Plateau",
            Location::DeadwoodValley => "Deadwood Canyon",
            Location::CausticCaves => "Caves of Fear",
            Location::FungusForest => "Mushroom Forest",
            Location::UndeadCrypt => "Haunted Halls",
            Location::BronzeMine => "Boiling Mine",
            Location::IcyRidge => "Icy Ridge",
            Location::Temple => "Temple",
        }
    }
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Spring => "Spring",
            Event::Summer => "Summer Moonstice",
            Event::Hamartia => "Hamartia",
            Event::Bolesh2x => "Fangs in the Dark",
            Event::Towering => "Towering",
            Event::AetherTalisman => "Aether Talisman",
            Event::Burnout => "Burnout",
            Event::BfgReheat => "Pallas' Judgment",
            Event::Anniversary2024 => "Anniversary 2024",
        }
    }
}

/// A location leaderboard id, eg. `rocky_plateau_15`: a known location,
/// optionally suffixed with a numeric difficulty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationBoard {
    pub location: Location,
    pub difficulty: Option<u32>,
}

impl LocationBoard {
    pub fn resolve(leaderboard_id: &str) -> LbResult<Self> {
        if let Ok(location) = Location::from_str(leaderboard_id) {
            return Ok(LocationBoard {
                location,
                difficulty: None,
            });
        }

        leaderboard_id
            .rsplit_once('_')
            .and_then(|(location, difficulty)| {
                match (Location::from_str(location), difficulty.parse::<u32>()) {
                    (Ok(location), Ok(difficulty)) => Some(LocationBoard {
                        location,
                        difficulty: Some(difficulty),
                    }),
                    _ => None,
                }
            })
            .ok_or_else(|| LbError::NotFound(format!("unknown leaderboard '{leaderboard_id}'")))
    }

    pub fn title(&self) -> String {
        match self.difficulty {
            Some(difficulty) => format!("{} ☆{}", self.location.name(), difficulty),
            None => self.location.name().to_string(),
        }
    }
}

pub fn resolve_event(event_id: &str) -> LbResult<Event> {
    Event::from_str(event_id)
        .map_err(|_| LbError::NotFound(format!("unknown event '{event_id}'")))
}

/// Every known location and event id, for help messages.
pub fn known_ids() -> (Vec<&'static str>, Vec<&'static str>) {
    (
        Location::iter().map(|l| l.into()).collect(),
        Event::iter().map(|e| e.into()).collect(),
    )
}
