use std::env;
use std::error::Error;
use std::path::Path;

const CONFIG_ENV_VAR: &str = "DRIVE_WARDEN_CONFIG";
const CONFIG_FILE_ARG: &str = "--config-file=";

fn not_found(message: String) -> Box<dyn Error> {
    Box::new(std::io::Error::new(std::io::ErrorKind::NotFound, message))
}

/// Resolves `path_string` against the current working directory when it is
/// relative and verifies the path exists.
pub fn resolve_path(path_string: &str) -> Result<String, Box<dyn Error>> {
    let path = Path::new(path_string);
    let resolved = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };
    if !resolved.exists() {
        return Err(not_found(format!("Path does not exist {}", path_string)));
    }
    Ok(resolved.to_string_lossy().into_owned())
}

pub fn resolve_first_path(paths: &[&str]) -> Result<String, Box<dyn Error>> {
    for &path in paths {
        if let Ok(resolved) = resolve_path(path) {
            return Ok(resolved);
        }
    }
    Err(not_found(format!("No valid path found: {:#?}", paths)))
}

fn resolve_command_line_arg(args: &[String]) -> Result<String, Box<dyn Error>> {
    if let Some(arg) = args.iter().find(|arg| arg.starts_with(CONFIG_FILE_ARG)) {
        let path = arg.trim_start_matches(CONFIG_FILE_ARG);
        if !path.is_empty() {
            return resolve_path(path).map_err(|_| {
                not_found(format!(
                    "Invalid path set by \"--config-file\" argument: {}",
                    path
                ))
            });
        }
    }
    Err(not_found(
        "No \"--config-file\" argument provided or path is empty".to_string(),
    ))
}

fn resolve_environment_var() -> Result<String, Box<dyn Error>> {
    match env::var(CONFIG_ENV_VAR) {
        Ok(env_path) => resolve_path(&env_path).map_err(|_| {
            not_found(format!(
                "Invalid path set by {}: {:#?}",
                CONFIG_ENV_VAR, env_path
            ))
        }),
        Err(_) => Err(not_found(format!(
            "Environment variable {} is not set",
            CONFIG_ENV_VAR
        ))),
    }
}

/// Config file lookup chain: `--config-file=` argument, then the
/// `DRIVE_WARDEN_CONFIG` environment variable, then the fallback paths.
pub fn resolve_config_file_path(
    cmd_args: &[String],
    fallback_paths: &[&str],
) -> Result<String, Box<dyn Error>> {
    resolve_command_line_arg(cmd_args)
        .or_else(|_| resolve_environment_var())
        .or_else(|_| resolve_first_path(fallback_paths))
}
