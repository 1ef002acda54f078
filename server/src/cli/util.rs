use std::io::Write;
use std::str::FromStr;

/// Print the prompt and read one line from the terminal. Read errors are printed and the user is
/// asked again.
fn read_line(prompt: &str) -> String {
    loop {
        println!("{}", prompt);
        print!("> ");
        let _ = std::io::stdout().flush();
        let mut user_input = String::new();
        match std::io::stdin().read_line(&mut user_input) {
            Ok(_) => return user_input.trim().to_owned(),
            Err(e) => println!("Error: {}", e),
        }
    }
}

/// Ask the user interactively for some single-line value in the terminal. The user's input is
/// converted to type [T]. In case of an error, the error is printed and the user is queried again
/// with the same prompt until the entered value is parsed successfully.
pub fn query_user<T: FromStr>(prompt: &str) -> T
where
    <T as FromStr>::Err: std::fmt::Display,
{
    query_user_and_check(prompt, |_| Ok::<(), &str>(()))
}

/// Like [query_user], but the parsed value is additionally checked with the validation_function.
pub fn query_user_and_check<T: FromStr, F, E>(prompt: &str, validation_function: F) -> T
where
    <T as FromStr>::Err: std::fmt::Display,
    F: Fn(&T) -> Result<(), E>,
    E: std::fmt::Display,
{
    loop {
        let value = match read_line(&format!("{}:", prompt)).parse() {
            Ok(value) => value,
            Err(e) => {
                println!("Error: {}", e);
                continue;
            }
        };
        match validation_function(&value) {
            Ok(()) => return value,
            Err(e) => println!("Error: {}", e),
        }
    }
}

/// Ask the user interactively for a boolean value in the terminal (entered as y/n). An empty input
/// selects the default, if given.
pub fn query_user_bool(prompt: &str, default: Option<bool>) -> bool {
    let value_help = match default {
        Some(true) => "Y/n",
        Some(false) => "y/N",
        None => "y/n",
    };
    loop {
        match (
            read_line(&format!("{} [{}]", prompt, value_help))
                .to_lowercase()
                .as_str(),
            default,
        ) {
            ("y", _) => return true,
            ("n", _) => return false,
            ("", Some(default)) => return default,
            _ => println!("Error: unknown option. Please enter 'y' or 'n'."),
        }
    }
}
