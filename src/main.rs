use iced::widget::image::Handle;
use iced::widget::{
    button, checkbox, column, container, image, pick_list, row, scrollable, text, text_input,
    Column,
};
use iced::{Alignment, Element, Length, Task, Theme};
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};

use ophtha_labeler::config::AppConfig;
use ophtha_labeler::imaging::classify::CopyClassifier;
use ophtha_labeler::logging;
use ophtha_labeler::state::edit::{
    ArtifactFlag, CENTERING_LEVELS, DIAGNOSTIC_UTILITIES, FIELD_OF_VIEW_LEVELS,
    ILLUMINATION_LEVELS, LATERALITIES, OBSTRUCTIONS, QUALITY_GRADES, SHARPNESS_LEVELS,
    STUDY_TYPES,
};
use ophtha_labeler::state::library::Library;
use ophtha_labeler::state::session::{
    CommitOutcome, FolderLoad, FormSource, Navigated, Preview, Session,
};
use ophtha_labeler::state::suggest::RandomSuggester;

/// Main application state
struct LabelerApp {
    /// Folder, cursor and staged edits
    session: Session,
    /// The annotation database (None if it could not be opened)
    library: Option<Library>,
    /// Copies committed files into Classified/<quality>/
    classifier: CopyClassifier,
    /// GPU handle for the current preview, rebuilt on navigation only
    preview: Option<Handle>,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User clicked "Select Folder"
    PickFolder,
    Next,
    Previous,
    /// User clicked "Save Whole Batch"
    CommitBatch,

    // ========== Form edits ==========
    StudyType(String),
    Laterality(String),
    Sharpness(String),
    Illumination(String),
    Centering(String),
    FieldOfView(String),
    Obstructions(String),
    Quality(String),
    DiagnosticUtility(String),
    ArtifactToggled(ArtifactFlag, bool),
    NotesChanged(String),
}

impl LabelerApp {
    /// Create a new instance of the application
    fn new(config: AppConfig) -> (Self, Task<Message>) {
        let library = match config.database().and_then(|location| Library::open(&location)) {
            Ok(library) => Some(library),
            Err(err) => {
                log::error!("Failed to open annotation database: {}", err);
                None
            }
        };

        let status = match &library {
            Some(library) => {
                let count = library.record_count().unwrap_or(0);
                format!("Ready. {} images labeled so far. Select a folder to begin.", count)
            }
            None => "⚠️ Database unavailable: labels cannot be saved.".to_string(),
        };

        let session = Session::new(Box::new(RandomSuggester::new()), config.preview_max_side);
        let classifier = CopyClassifier::new(config.output_dir.clone());

        log::info!(
            "Labeler started; classified copies go to {}",
            classifier.base_dir().display()
        );

        (
            LabelerApp {
                session,
                library,
                classifier,
                preview: None,
                status,
            },
            Task::none(),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::PickFolder => self.pick_folder(),
            Message::Next => {
                match self.session.advance() {
                    Navigated::Moved => self.after_navigation(),
                    Navigated::EndOfList => {
                        self.status = "Changes kept in memory.".to_string();
                        notify(
                            MessageLevel::Info,
                            "End",
                            "You have reached the last image in the folder.",
                        );
                    }
                    Navigated::AtStart | Navigated::NoSelection => {}
                }
            }
            Message::Previous => {
                if self.session.retreat() == Navigated::Moved {
                    self.after_navigation();
                }
            }
            Message::CommitBatch => self.commit_batch(),

            Message::StudyType(value) => self.session.form_mut().study_type = value,
            Message::Laterality(value) => self.session.form_mut().laterality = value,
            Message::Sharpness(value) => self.session.form_mut().sharpness = value,
            Message::Illumination(value) => self.session.form_mut().illumination = value,
            Message::Centering(value) => self.session.form_mut().centering = value,
            Message::FieldOfView(value) => self.session.form_mut().field_of_view = value,
            Message::Obstructions(value) => self.session.form_mut().obstructions = value,
            Message::Quality(value) => self.session.form_mut().quality = value,
            Message::DiagnosticUtility(value) => {
                self.session.form_mut().diagnostic_utility = value
            }
            Message::ArtifactToggled(flag, on) => self.session.form_mut().artifacts.set(flag, on),
            Message::NotesChanged(value) => self.session.form_mut().doctor_notes = value,
        }

        Task::none()
    }

    fn pick_folder(&mut self) {
        // Cancelled dialog: nothing changes
        let Some(folder) = FileDialog::new()
            .set_title("Select Folder with Eye Images")
            .pick_folder()
        else {
            return;
        };

        match self.session.load_folder(&folder) {
            Ok(FolderLoad::Loaded { count }) => {
                log::info!("Browsing {} ({} images)", folder.display(), count);
                self.after_navigation();
            }
            Ok(FolderLoad::Empty) => {
                self.preview = None;
                self.status = "No valid images found.".to_string();
                notify(
                    MessageLevel::Warning,
                    "Empty folder",
                    "No valid images were found in the folder.",
                );
            }
            Err(err) => {
                self.status = format!("❌ Could not read folder: {}", err);
            }
        }
    }

    /// Rebuild the preview handle and status after the current image changed
    fn after_navigation(&mut self) {
        self.preview = match self.session.preview() {
            Preview::Ready(display) => Some(Handle::from_rgba(
                display.width,
                display.height,
                display.rgba.clone(),
            )),
            Preview::Failed(_) | Preview::Empty => None,
        };

        self.status = match self.session.form_source() {
            Some(FormSource::Restored) => "Data recovered from memory".to_string(),
            Some(FormSource::Suggested) => format!(
                "Suggestions loaded ({}). Please review.",
                self.session.suggester_name()
            ),
            None => String::new(),
        };
    }

    fn commit_batch(&mut self) {
        let Some(library) = self.library.as_mut() else {
            notify(
                MessageLevel::Error,
                "Error",
                "The annotation database is not available.",
            );
            return;
        };

        let result = self.session.commit_batch(library, &mut self.classifier, |count| {
            let answer = MessageDialog::new()
                .set_level(MessageLevel::Info)
                .set_title("Confirm")
                .set_description(format!("Do you want to process {} images?", count))
                .set_buttons(MessageButtons::YesNo)
                .show();
            answer == MessageDialogResult::Yes
        });

        match result {
            Ok(CommitOutcome::NothingPending) => {
                notify(MessageLevel::Info, "Info", "There are no pending changes to save.");
            }
            Ok(CommitOutcome::Declined { pending }) => {
                self.status = format!("{} images still pending.", pending);
            }
            Ok(CommitOutcome::Committed { count }) => {
                self.preview = None;
                self.status = "Batch processed. Load a new folder.".to_string();
                notify(
                    MessageLevel::Info,
                    "Success",
                    &format!("{} images were processed successfully.", count),
                );
            }
            Err(err) => {
                log::error!("Batch commit failed: {}", err);
                self.status = "❌ Batch not saved. Nothing was written.".to_string();
                notify(
                    MessageLevel::Error,
                    "Error",
                    &format!("An error occurred while saving the batch: {}", err),
                );
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        container(row![self.image_panel(), self.form_panel()].spacing(20))
            .width(Length::Fill)
            .height(Length::Fill)
            .padding(20)
            .into()
    }

    fn image_panel(&self) -> Element<Message> {
        let picture: Element<Message> = match (&self.preview, self.session.preview()) {
            (Some(handle), _) => image(handle.clone()).into(),
            (None, Preview::Failed(_)) => text("Error loading image").size(18).into(),
            (None, _) => text("Load a folder to begin").size(18).into(),
        };

        let progress = match self.session.navigation().progress() {
            Some((position, total)) => format!("Image {} of {}", position, total),
            None => "0 / 0".to_string(),
        };

        let has_files = !self.session.navigation().is_empty();

        let navigation = row![
            button("<< Previous").on_press_maybe(has_files.then_some(Message::Previous)),
            button("Select Folder").on_press(Message::PickFolder),
            button("Next >>").on_press_maybe(has_files.then_some(Message::Next)),
        ]
        .spacing(20)
        .align_y(Alignment::Center);

        column![
            container(picture)
                .width(Length::Fill)
                .height(Length::Fill)
                .center_x(Length::Fill)
                .center_y(Length::Fill),
            text(progress).size(14),
            navigation,
        ]
        .spacing(10)
        .width(Length::FillPortion(3))
        .align_x(Alignment::Center)
        .into()
    }

    fn form_panel(&self) -> Element<Message> {
        let form = self.session.form();

        let artifacts = Column::with_children(ArtifactFlag::ALL.into_iter().map(|flag| {
            checkbox(flag.label(), form.artifacts.contains(flag))
                .on_toggle(move |on| Message::ArtifactToggled(flag, on))
                .into()
        }))
        .spacing(4);

        let pending = self.session.pending_count();

        let content = column![
            text("Study Validation").size(22),
            choice("Study type", STUDY_TYPES, &form.study_type, Message::StudyType),
            choice("Laterality", LATERALITIES, &form.laterality, Message::Laterality),
            text("Technical Assessment").size(16),
            choice("Sharpness", SHARPNESS_LEVELS, &form.sharpness, Message::Sharpness),
            choice("Illumination", ILLUMINATION_LEVELS, &form.illumination, Message::Illumination),
            choice("Centering", CENTERING_LEVELS, &form.centering, Message::Centering),
            choice("Field of view", FIELD_OF_VIEW_LEVELS, &form.field_of_view, Message::FieldOfView),
            text("Problems").size(16),
            artifacts,
            choice("Obstructions", OBSTRUCTIONS, &form.obstructions, Message::Obstructions),
            text("Conclusion").size(16),
            choice("Clinical gradability", QUALITY_GRADES, &form.quality, Message::Quality),
            choice(
                "Diagnostic utility",
                DIAGNOSTIC_UTILITIES,
                &form.diagnostic_utility,
                Message::DiagnosticUtility
            ),
            text("Additional notes (optional)").size(14),
            text_input("Clinical observations", &form.doctor_notes)
                .on_input(Message::NotesChanged),
            button(text(format!("Save Whole Batch ({} pending)", pending)))
                .on_press(Message::CommitBatch)
                .width(Length::Fill)
                .padding(10),
            text(&self.status).size(14),
        ]
        .spacing(10)
        .padding(10);

        scrollable(content).width(Length::FillPortion(2)).into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Labeled drop-down for one vocabulary field
fn choice<'a>(
    label: &'a str,
    options: &'static [&'static str],
    value: &str,
    on_select: fn(String) -> Message,
) -> Element<'a, Message> {
    let options: Vec<String> = options.iter().map(|option| option.to_string()).collect();
    let selected = (!value.is_empty()).then(|| value.to_string());

    column![
        text(label).size(14),
        pick_list(options, selected, on_select)
            .placeholder("Select...")
            .width(Length::Fill),
    ]
    .spacing(4)
    .into()
}

/// Show a blocking message box
fn notify(level: MessageLevel, title: &str, description: &str) {
    let _ = MessageDialog::new()
        .set_level(level)
        .set_title(title)
        .set_description(description)
        .set_buttons(MessageButtons::Ok)
        .show();
}

fn main() -> iced::Result {
    let loaded = AppConfig::load();
    let level = loaded
        .as_ref()
        .map(|config| config.log_level)
        .unwrap_or_default();
    logging::init(level.to_level_filter());

    let config = loaded.unwrap_or_else(|err| {
        log::error!("Falling back to default configuration: {}", err);
        AppConfig::default()
    });

    iced::application(
        "Ophthalmic Image Labeler",
        LabelerApp::update,
        LabelerApp::view,
    )
    .theme(LabelerApp::theme)
    .window_size((1200.0, 800.0))
    .centered()
    .run_with(move || LabelerApp::new(config))
}
