use crate::cli_error::CliError;
use crate::data_store::get_store_from_env;
use crate::data_store::models::ProcessingState;
use crate::data_store::ReservationStore;

/// Print all reservations (or only the unprocessed ones) as a table
pub fn print_reservation_list(new_only: bool) -> Result<(), CliError> {
    let data_store_pool = get_store_from_env()?;
    let mut data_store = data_store_pool.get_facade()?;

    let reservations = if new_only {
        data_store.all_new_reservations()?
    } else {
        data_store.all_reservations()?
    };

    let mut table = comfy_table::Table::new();
    table
        .load_preset(comfy_table::presets::ASCII_BORDERS_ONLY_CONDENSED)
        .set_header(vec![
            "id",
            "room",
            "arrival",
            "departure",
            "guest",
            "email",
            "phone",
            "processed",
        ])
        .set_content_arrangement(comfy_table::ContentArrangement::Dynamic)
        .add_rows(reservations.iter().map(|r| {
            [
                r.reservation.id.to_string(),
                r.room.room_name.clone(),
                r.reservation.start_date.to_string(),
                r.reservation.end_date.to_string(),
                format!("{} {}", r.reservation.first_name, r.reservation.last_name),
                r.reservation.email.clone(),
                r.reservation.phone.clone(),
                match r.reservation.processed {
                    ProcessingState::Processed => "yes".to_owned(),
                    ProcessingState::New => "".to_owned(),
                    ProcessingState::Unknown => "?".to_owned(),
                },
            ]
        }));

    if new_only {
        println!("{} new reservations:", reservations.len());
    } else {
        println!("{} reservations:", reservations.len());
    }
    println!("{table}");
    Ok(())
}
