use permit_desk::{Notice, NoticeLevel, Notifier};

/// Prints notices to the terminal: info on stdout, problems on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => println!("{}\n{}\n", notice.title, notice.message),
            NoticeLevel::Warning | NoticeLevel::Error => eprintln!(
                "[{}] {}\n{}\n",
                notice.level.label(),
                notice.title,
                notice.message
            ),
        }
    }
}
