//! Sessions with a small retail catalog registered.

use polyglot_dataframe::{Session, SessionConfig};

/// Compact, unquoted Spark output with the optimizer on.
pub fn session() -> Session {
    with_config(SessionConfig {
        pretty: false,
        identify: false,
        ..Default::default()
    })
}

/// Same catalog, optimizer off: the rendered text mirrors the plan.
pub fn raw_session() -> Session {
    with_config(SessionConfig {
        pretty: false,
        identify: false,
        optimize: false,
        ..Default::default()
    })
}

pub fn with_config(config: SessionConfig) -> Session {
    let session = Session::with_config(config);
    session
        .register_table(
            "employee",
            &[
                ("employee_id", "INT"),
                ("fname", "STRING"),
                ("lname", "STRING"),
                ("age", "INT"),
                ("store_id", "INT"),
            ],
        )
        .unwrap();
    session
        .register_table(
            "store",
            &[
                ("store_id", "INT"),
                ("store_name", "STRING"),
                ("district_id", "INT"),
                ("num_sales", "INT"),
            ],
        )
        .unwrap();
    session
}

/// Register `name` with `columns`, all typed INT.
pub fn int_table(session: &Session, name: &str, columns: &[&str]) {
    let columns: Vec<(&str, &str)> = columns.iter().map(|c| (*c, "INT")).collect();
    session.register_table(name, &columns).unwrap();
}
