use std::process::Command;

pub(crate) fn split_shell_args<T: AsRef<str> + ?Sized>(s: &T) -> Option<Vec<String>> {
    shlex::split(s.as_ref())
}

pub(crate) fn join_shell_args<T: AsRef<str>>(args: &[T]) -> String {
    // only fails on nul bytes, which can't reach a Command anyway
    shlex::try_join(args.iter().map(AsRef::as_ref)).unwrap_or_else(|_| {
        args.iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join(" ")
    })
}

/// Render a command the way a user would type it, for log output.
pub(crate) fn describe(cmd: &Command) -> String {
    let mut args = vec![cmd.get_program().to_string_lossy().into_owned()];
    args.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    join_shell_args(&args)
}
