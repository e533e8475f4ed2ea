//! Button edge tasks
//!
//! One task per button. Buttons pull the input low while pressed. No
//! debouncing happens here; the controller's intent filter only acts on a
//! press that has been held long enough.

use defmt::*;
use embassy_rp::gpio::Input;
use embassy_time::Instant;

use torqvalve_core::input::{Button, ButtonEdge};

use crate::channels::{EdgeEvent, EDGE_CHANNEL};

/// Forward press and release edges of one button
#[embassy_executor::task(pool_size = 2)]
pub async fn button_task(mut pin: Input<'static>, button: Button) {
    info!("Button task started: {}", button);

    loop {
        pin.wait_for_low().await;
        send(ButtonEdge::Pressed(button)).await;

        pin.wait_for_high().await;
        send(ButtonEdge::Released(button)).await;
    }
}

async fn send(edge: ButtonEdge) {
    let event = EdgeEvent {
        edge,
        at_ms: Instant::now().as_millis(),
    };
    if EDGE_CHANNEL.try_send(event).is_err() {
        // Controller busy with a servo exchange; wait for room
        EDGE_CHANNEL.send(event).await;
    }
}
