//! Main controller task
//!
//! Owns the valve controller and the button intent filter. Sleeps until
//! either a button edge arrives or the earliest pending deadline (hold
//! timer, torque sample, motion deadline, emergency hold) comes due.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_time::{Delay, Instant, Timer};

use torqvalve_core::input::IntentFilter;
use torqvalve_core::{Transition, ValveController};
use torqvalve_drivers::servo::Ax12;

use crate::channels::{EDGE_CHANNEL, INDICATOR};
use crate::line::ServoLink;

/// The servo as driven by the controller
pub type Servo = Ax12<ServoLink, Delay>;

/// Controller task - main coordination loop
#[embassy_executor::task]
pub async fn controller_task(mut controller: ValveController<Servo>, mut filter: IntentFilter) {
    info!("Controller task started");
    INDICATOR.signal(controller.pattern());

    loop {
        let now_ms = Instant::now().as_millis();

        while let Some(intent) = filter.poll(now_ms) {
            info!("Intent: {}", intent);
            match controller.handle_intent(intent, now_ms) {
                Some(transition) => report(&controller, transition),
                None => debug!("Intent ignored in {}", controller.state()),
            }
        }

        while let Some(transition) = controller.poll(now_ms) {
            report(&controller, transition);
        }

        let wakeup = match (filter.next_wakeup(), controller.next_wakeup()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let deadline = wakeup.map_or(Instant::MAX, Instant::from_millis);

        match select(EDGE_CHANNEL.receive(), Timer::at(deadline)).await {
            Either::First(event) => {
                debug!("Button edge: {}", event);
                filter.on_edge(event.edge, event.at_ms);
            }
            Either::Second(()) => {}
        }
    }
}

fn report(controller: &ValveController<Servo>, transition: Transition) {
    info!(
        "{} -> {} on {}",
        transition.from, transition.to, transition.event
    );
    INDICATOR.signal(controller.pattern());
}
