//! `wishwall-stage`: everything the big screen needs, computed server-side.
//!
//! | Module        | Role                                                  |
//! |---------------|-------------------------------------------------------|
//! | [`rotation`]  | Which of the newest records is the current hero       |
//! | [`countdown`] | Spotlight countdown: showing → exiting → cleared      |
//! | [`view`]      | Stage frame and wall projections, `time_ago` labels   |
//! | [`engine`]    | Background loop that drives the above on timers       |

pub mod countdown;
pub mod engine;
pub mod rotation;
pub mod view;

pub use countdown::{Countdown, CountdownStep, CountdownView, Phase};
pub use engine::{StageControl, StageEngine, StageHandle, StageUpdate};
pub use rotation::Rotation;
pub use view::{HeroCard, SideItem, StageFrame};
