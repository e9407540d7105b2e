use tabled::Table;

use crate::{cli::connect, info, types::NowPlayingTableRow};

/// Prints the current track, position, play state and volume as a table.
pub async fn now() {
    let connection = connect().await;
    let state = connection.sync.state();
    connection.sync.stop();

    if state.track.is_none() {
        info!("Nothing is playing.");
        return;
    }

    if let Some(device) = &state.device_name {
        info!("Device: {}", device);
    }
    let table = Table::new(vec![NowPlayingTableRow::from(&state)]);
    println!("{}", table);
}
