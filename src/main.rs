mod api;
mod config;
mod settings;
mod summarize;
mod toast;

use iced::{
    Element, Length, Task, Theme,
    alignment, clipboard,
    event::{self, Event as IcedEvent},
    keyboard::{self, Key},
    time,
    widget::{
        button, center, column, container, markdown, mouse_area, opaque, pick_list, row,
        scrollable, stack, text, text_editor, text_input, text_input::Id,
    },
    window,
};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use api::OpenAiClient;
use config::Config;
use settings::{DEFAULT_MODEL, DEFAULT_PROMPT, Settings, SettingsStore, Tab};
use summarize::{InputMode, Outcome};
use toast::Toasts;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const MODEL_CHOICES: [&str; 3] = ["gpt-4o", "gpt-4o-mini", "custom"];

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load();

    iced::application("Sumbar", App::update, App::view)
        .theme(App::theme)
        .subscription(App::subscription)
        .window(window::Settings {
            size: iced::Size::new(config.window.width as f32, config.window.height as f32),
            min_size: Some(iced::Size::new(
                config.window.min_width as f32,
                config.window.min_height as f32,
            )),
            position: window::Position::Centered,
            ..Default::default()
        })
        .run_with(App::new)
}

#[derive(Debug, Clone)]
enum Message {
    TabSelected(InputMode),
    UrlChanged(String),
    TextEdited(text_editor::Action),
    ClearInput,
    ScriptSelected(String),
    Submit,
    SummaryReady(Outcome),
    SummaryFailed(String),
    Tick,
    CopySummary,
    LinkClicked(markdown::Url),
    ShowOriginal,
    CloseOriginal,
    OpenSettings,
    CloseSettings,
    SaveSettings,
    FormApiKeyChanged(String),
    FormToggleKeyVisibility,
    FormModelPicked(String),
    FormModelEdited(String),
    FormUrlChanged(String),
    FormPathChanged(String),
    FormDefaultTabPicked(Tab),
    FormScriptChanged(usize, String),
    FormAddScript,
    FormRemoveScript(usize),
    EscapePressed,
}

/// Draft state for the settings dialog; discarded on cancel, written through
/// the store on save.
struct SettingsForm {
    draft: Settings,
    show_api_key: bool,
    custom_model: bool,
}

impl SettingsForm {
    fn new(settings: &Settings) -> Self {
        let custom_model = !MODEL_CHOICES[..2].contains(&settings.api_model.as_str());
        SettingsForm {
            draft: settings.clone(),
            show_api_key: false,
            custom_model,
        }
    }

    fn model_choice(&self) -> String {
        if self.custom_model {
            "custom".to_string()
        } else {
            self.draft.api_model.clone()
        }
    }
}

struct App {
    mode: InputMode,
    url_draft: String,
    text_draft: text_editor::Content,
    selected_script: Option<String>,
    original_content: String,
    summary_raw: String,
    summary_items: Vec<markdown::Item>,
    is_loading: bool,
    loading_frame: usize,
    show_original: bool,
    settings_form: Option<SettingsForm>,
    settings: Settings,
    store: SettingsStore,
    toasts: Toasts,
    prompt_selection: bool,
    input_id: Id,
}

impl App {
    fn new() -> (Self, Task<Message>) {
        let config = Config::load();
        let store = SettingsStore::open_default();

        let (settings, load_error) = match store.load() {
            Ok(settings) => (settings, None),
            Err(e) => {
                tracing::warn!("failed to load settings: {:#}", e);
                (
                    Settings::default(),
                    Some(format!("Failed to load settings: {}", e)),
                )
            }
        };

        let mut app = Self::from_parts(store, settings, config.ui.prompt_selection);
        if let Some(message) = load_error {
            app.toasts.error(message);
        }

        let focus_task = text_input::focus(app.input_id.clone());
        (app, focus_task)
    }

    fn from_parts(store: SettingsStore, settings: Settings, prompt_selection: bool) -> Self {
        let mode = match settings.default_tab {
            Tab::Url => InputMode::Url,
            Tab::Text => InputMode::Text,
        };

        App {
            mode,
            url_draft: String::new(),
            text_draft: text_editor::Content::new(),
            selected_script: settings.api_script.first().cloned(),
            original_content: String::new(),
            summary_raw: String::new(),
            summary_items: Vec::new(),
            is_loading: false,
            loading_frame: 0,
            show_original: false,
            settings_form: None,
            settings,
            store,
            toasts: Toasts::default(),
            prompt_selection,
            input_id: Id::unique(),
        }
    }

    fn clear_result(&mut self) {
        self.summary_raw.clear();
        self.summary_items.clear();
        self.original_content.clear();
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::TabSelected(mode) => {
                self.mode = mode;
                self.clear_result();
                Task::none()
            }
            Message::UrlChanged(value) => {
                self.url_draft = value;
                Task::none()
            }
            Message::TextEdited(action) => {
                self.text_draft.perform(action);
                Task::none()
            }
            Message::ClearInput => {
                match self.mode {
                    InputMode::Url => self.url_draft.clear(),
                    InputMode::Text => self.text_draft = text_editor::Content::new(),
                }
                Task::none()
            }
            Message::ScriptSelected(script) => {
                self.selected_script = Some(script);
                Task::none()
            }
            Message::Submit => {
                // Ignore re-submits while a request is in flight
                if self.is_loading {
                    return Task::none();
                }

                let script = if self.prompt_selection {
                    self.selected_script.clone()
                } else {
                    self.settings.api_script.first().cloned()
                };

                let text = self.text_draft.text();
                let request = match summarize::validate(
                    self.mode,
                    &self.url_draft,
                    &text,
                    script.as_deref(),
                    self.prompt_selection,
                ) {
                    Ok(request) => request,
                    Err(e) => {
                        self.toasts.error(e.to_string());
                        return Task::none();
                    }
                };

                self.is_loading = true;
                self.clear_result();

                let client = OpenAiClient::from_settings(&self.settings);

                Task::future(async move {
                    match summarize::run(&client, request).await {
                        Ok(outcome) => Message::SummaryReady(outcome),
                        Err(e) => Message::SummaryFailed(e.to_string()),
                    }
                })
            }
            Message::SummaryReady(outcome) => {
                self.is_loading = false;
                self.original_content = outcome.original_content;
                self.summary_items = markdown::parse(&outcome.summary_markdown).collect();
                self.summary_raw = outcome.summary_markdown;
                Task::none()
            }
            Message::SummaryFailed(error) => {
                tracing::error!("summarization failed: {}", error);
                self.is_loading = false;
                self.toasts.error(error);
                Task::none()
            }
            Message::Tick => {
                if self.is_loading {
                    self.loading_frame = (self.loading_frame + 1) % SPINNER_FRAMES.len();
                }
                self.toasts.prune();
                Task::none()
            }
            Message::CopySummary => clipboard::write(self.summary_raw.clone()),
            Message::LinkClicked(url) => {
                if let Err(e) = open::that(url.as_str()) {
                    tracing::warn!("failed to open link: {}", e);
                }
                Task::none()
            }
            Message::ShowOriginal => {
                self.show_original = true;
                Task::none()
            }
            Message::CloseOriginal => {
                self.show_original = false;
                Task::none()
            }
            Message::OpenSettings => {
                // Re-read the document so the dialog reflects what is on disk
                match self.store.load() {
                    Ok(settings) => self.settings = settings,
                    Err(e) => {
                        tracing::warn!("failed to reload settings: {:#}", e);
                        self.toasts.error(format!("Failed to load settings: {}", e));
                    }
                }
                self.settings_form = Some(SettingsForm::new(&self.settings));
                Task::none()
            }
            Message::CloseSettings => {
                self.settings_form = None;
                Task::none()
            }
            Message::SaveSettings => {
                let Some(form) = self.settings_form.take() else {
                    return Task::none();
                };

                let mut saved = form.draft;
                saved.api_script = saved
                    .api_script
                    .into_iter()
                    .enumerate()
                    .filter_map(|(i, script)| {
                        let trimmed = script.trim().to_string();
                        if i == 0 && trimmed.is_empty() {
                            Some(DEFAULT_PROMPT.to_string())
                        } else if trimmed.is_empty() {
                            None
                        } else {
                            Some(trimmed)
                        }
                    })
                    .collect();
                if saved.api_model.trim().is_empty() {
                    saved.api_model = DEFAULT_MODEL.to_string();
                }

                match self.store.save(&saved) {
                    Ok(()) => {
                        self.settings = saved;
                        if !self
                            .selected_script
                            .as_ref()
                            .is_some_and(|s| self.settings.api_script.contains(s))
                        {
                            self.selected_script = self.settings.api_script.first().cloned();
                        }
                        self.toasts.success("Settings saved");
                    }
                    Err(e) => {
                        tracing::error!("failed to save settings: {:#}", e);
                        self.settings_form = Some(SettingsForm::new(&saved));
                        self.toasts.error(format!("Failed to save settings: {}", e));
                    }
                }
                Task::none()
            }
            Message::FormApiKeyChanged(value) => {
                if let Some(form) = &mut self.settings_form {
                    form.draft.api_key = value;
                }
                Task::none()
            }
            Message::FormToggleKeyVisibility => {
                if let Some(form) = &mut self.settings_form {
                    form.show_api_key = !form.show_api_key;
                }
                Task::none()
            }
            Message::FormModelPicked(choice) => {
                if let Some(form) = &mut self.settings_form {
                    if choice == "custom" {
                        // Keep the stored model string, just unlock editing
                        form.custom_model = true;
                    } else {
                        form.custom_model = false;
                        form.draft.api_model = choice;
                    }
                }
                Task::none()
            }
            Message::FormModelEdited(value) => {
                if let Some(form) = &mut self.settings_form {
                    form.draft.api_model = value;
                }
                Task::none()
            }
            Message::FormUrlChanged(value) => {
                if let Some(form) = &mut self.settings_form {
                    form.draft.api_url = value;
                }
                Task::none()
            }
            Message::FormPathChanged(value) => {
                if let Some(form) = &mut self.settings_form {
                    form.draft.api_path = value;
                }
                Task::none()
            }
            Message::FormDefaultTabPicked(tab) => {
                if let Some(form) = &mut self.settings_form {
                    form.draft.default_tab = tab;
                }
                Task::none()
            }
            Message::FormScriptChanged(index, value) => {
                if let Some(form) = &mut self.settings_form {
                    if let Some(entry) = form.draft.api_script.get_mut(index) {
                        *entry = value;
                    }
                }
                Task::none()
            }
            Message::FormAddScript => {
                if let Some(form) = &mut self.settings_form {
                    form.draft.api_script.push(String::new());
                }
                Task::none()
            }
            Message::FormRemoveScript(index) => {
                if let Some(form) = &mut self.settings_form {
                    // The default prompt at index 0 is not removable
                    if index > 0 && index < form.draft.api_script.len() {
                        form.draft.api_script.remove(index);
                    }
                }
                Task::none()
            }
            Message::EscapePressed => {
                if self.settings_form.is_some() {
                    self.settings_form = None;
                } else if self.show_original {
                    self.show_original = false;
                }
                Task::none()
            }
        }
    }

    fn subscription(&self) -> iced::Subscription<Message> {
        let timer = if self.is_loading || !self.toasts.is_empty() {
            time::every(Duration::from_millis(80)).map(|_| Message::Tick)
        } else {
            iced::Subscription::none()
        };

        let events = event::listen_with(|event, _status, _id| {
            if let IcedEvent::Keyboard(keyboard::Event::KeyPressed {
                key: Key::Named(keyboard::key::Named::Escape),
                ..
            }) = event
            {
                Some(Message::EscapePressed)
            } else {
                None
            }
        });

        iced::Subscription::batch([timer, events])
    }

    fn view(&self) -> Element<Message> {
        let base = column![
            self.tab_bar(),
            self.input_area(),
            self.result_area(),
            self.footer(),
        ]
        .spacing(10)
        .padding(12);

        let mut layers = stack![container(base).width(Length::Fill).height(Length::Fill)];

        if self.show_original {
            layers = layers.push(modal_backdrop(self.original_view(), Message::CloseOriginal));
        }

        if let Some(form) = &self.settings_form {
            layers = layers.push(modal_backdrop(self.settings_view(form), Message::CloseSettings));
        }

        if !self.toasts.is_empty() {
            layers = layers.push(toast::view(&self.toasts));
        }

        layers.into()
    }

    fn tab_bar(&self) -> Element<Message> {
        let tab = |label, mode: InputMode| {
            let style: fn(&Theme, button::Status) -> button::Style = if self.mode == mode {
                button::primary
            } else {
                button::text
            };
            button(text(label).size(15))
                .on_press(Message::TabSelected(mode))
                .style(style)
                .padding([6, 18])
        };

        row![tab("URL", InputMode::Url), tab("Text", InputMode::Text)]
            .spacing(6)
            .into()
    }

    fn input_area(&self) -> Element<Message> {
        let submit_label = if self.is_loading {
            "Summarizing..."
        } else {
            "Summarize"
        };
        let submit = button(text(submit_label).size(15))
            .on_press(Message::Submit)
            .padding([8, 16]);
        let clear = button(text("Clear").size(15))
            .on_press(Message::ClearInput)
            .style(button::secondary)
            .padding([8, 16]);

        let entry: Element<Message> = match self.mode {
            InputMode::Url => row![
                text_input("Enter a web page URL...", &self.url_draft)
                    .on_input(Message::UrlChanged)
                    .on_submit(Message::Submit)
                    .padding(10)
                    .size(15)
                    .id(self.input_id.clone()),
                clear,
                submit,
            ]
            .spacing(8)
            .align_y(alignment::Vertical::Center)
            .into(),
            InputMode::Text => column![
                text_editor(&self.text_draft)
                    .placeholder("Enter the text to summarize...")
                    .on_action(Message::TextEdited)
                    .height(Length::Fixed(120.0)),
                row![clear, submit].spacing(8),
            ]
            .spacing(8)
            .into(),
        };

        let mut area = column![entry].spacing(8);

        if self.prompt_selection && self.settings.api_script.len() > 1 {
            area = area.push(
                row![
                    text("Prompt").size(14),
                    pick_list(
                        self.settings.api_script.clone(),
                        self.selected_script.clone(),
                        Message::ScriptSelected,
                    )
                    .width(Length::Fill)
                    .text_size(14),
                ]
                .spacing(8)
                .align_y(alignment::Vertical::Center),
            );
        }

        area.into()
    }

    fn result_area(&self) -> Element<Message> {
        let output: Element<Message> = if self.is_loading {
            container(
                column![
                    text(SPINNER_FRAMES[self.loading_frame]).size(32),
                    text("Summarizing...").size(15),
                ]
                .spacing(10)
                .align_x(alignment::Horizontal::Center),
            )
            .width(Length::Fill)
            .height(Length::Fill)
            .align_x(alignment::Horizontal::Center)
            .align_y(alignment::Vertical::Center)
            .into()
        } else if !self.summary_items.is_empty() {
            let rendered = markdown::view(
                &self.summary_items,
                markdown::Settings::default(),
                markdown::Style::from_palette(self.theme().palette()),
            )
            .map(Message::LinkClicked);

            let copy = container(
                button(text("Copy").size(14))
                    .on_press(Message::CopySummary)
                    .style(button::secondary)
                    .padding([6, 12]),
            )
            .width(Length::Fill)
            .align_x(alignment::Horizontal::Right);

            column![
                scrollable(container(rendered).padding(15).width(Length::Fill))
                    .height(Length::Fill),
                copy,
            ]
            .spacing(8)
            .into()
        } else {
            container(text("The summary will appear here.").size(14))
                .padding(15)
                .width(Length::Fill)
                .height(Length::Fill)
                .into()
        };

        container(output)
            .width(Length::Fill)
            .height(Length::Fill)
            .style(container::rounded_box)
            .into()
    }

    fn footer(&self) -> Element<Message> {
        let original = button(text("Original content").size(13))
            .style(button::text)
            .on_press_maybe((!self.original_content.is_empty()).then_some(Message::ShowOriginal));

        row![
            original,
            container(text("Powered by OpenAI").size(12))
                .width(Length::Fill)
                .align_x(alignment::Horizontal::Right),
            button(text("Settings").size(13))
                .style(button::text)
                .on_press(Message::OpenSettings),
        ]
        .spacing(8)
        .align_y(alignment::Vertical::Center)
        .into()
    }

    fn original_view(&self) -> Element<Message> {
        container(
            column![
                text("Original content").size(18),
                scrollable(text(&self.original_content).size(14)).height(Length::Fixed(400.0)),
                container(
                    button(text("Close").size(14))
                        .on_press(Message::CloseOriginal)
                        .padding([6, 16]),
                )
                .width(Length::Fill)
                .align_x(alignment::Horizontal::Right),
            ]
            .spacing(12),
        )
        .width(Length::Fixed(620.0))
        .padding(20)
        .style(container::rounded_box)
        .into()
    }

    fn settings_view(&self, form: &SettingsForm) -> Element<Message> {
        let label = |name| text(name).size(13).width(Length::Fixed(90.0));

        let key_input = text_input("Enter your API key", &form.draft.api_key)
            .secure(!form.show_api_key)
            .on_input(Message::FormApiKeyChanged)
            .padding(8)
            .size(14);
        let key_toggle = button(text(if form.show_api_key { "Hide" } else { "Show" }).size(13))
            .style(button::secondary)
            .on_press(Message::FormToggleKeyVisibility)
            .padding([6, 10]);

        let model_choices: Vec<String> = MODEL_CHOICES.iter().map(|s| s.to_string()).collect();
        let mut model_row = row![pick_list(
            model_choices,
            Some(form.model_choice()),
            Message::FormModelPicked,
        )
        .text_size(14)]
        .spacing(8);
        if form.custom_model {
            model_row = model_row.push(
                text_input("Enter a model name", &form.draft.api_model)
                    .on_input(Message::FormModelEdited)
                    .padding(8)
                    .size(14),
            );
        }

        let mut scripts = column![].spacing(6);
        for (i, script) in form.draft.api_script.iter().enumerate() {
            let placeholder = if i == 0 { "Default prompt" } else { "Prompt" };
            scripts = scripts.push(
                row![
                    text_input(placeholder, script)
                        .on_input(move |value| Message::FormScriptChanged(i, value))
                        .padding(8)
                        .size(14),
                    // Index 0 is the default prompt and stays
                    button(text("Remove").size(13))
                        .style(button::secondary)
                        .on_press_maybe((i > 0).then_some(Message::FormRemoveScript(i)))
                        .padding([6, 10]),
                ]
                .spacing(8)
                .align_y(alignment::Vertical::Center),
            );
        }
        scripts = scripts.push(
            button(text("Add prompt").size(13))
                .style(button::secondary)
                .on_press(Message::FormAddScript)
                .padding([6, 10]),
        );

        let form_body = column![
            row![label("API Key"), key_input, key_toggle]
                .spacing(8)
                .align_y(alignment::Vertical::Center),
            row![label("API Model"), model_row]
                .spacing(8)
                .align_y(alignment::Vertical::Center),
            row![
                label("API URL"),
                text_input("API base URL", &form.draft.api_url)
                    .on_input(Message::FormUrlChanged)
                    .padding(8)
                    .size(14),
            ]
            .spacing(8)
            .align_y(alignment::Vertical::Center),
            row![
                label("API Path"),
                text_input("API path", &form.draft.api_path)
                    .on_input(Message::FormPathChanged)
                    .padding(8)
                    .size(14),
            ]
            .spacing(8)
            .align_y(alignment::Vertical::Center),
            row![
                label("Default tab"),
                pick_list(
                    [Tab::Url, Tab::Text],
                    Some(form.draft.default_tab),
                    Message::FormDefaultTabPicked,
                )
                .text_size(14),
            ]
            .spacing(8)
            .align_y(alignment::Vertical::Center),
            row![label("Prompts"), scripts].spacing(8),
        ]
        .spacing(12);

        let buttons = row![
            button(text("Cancel").size(14))
                .style(button::secondary)
                .on_press(Message::CloseSettings)
                .padding([6, 16]),
            button(text("Save").size(14))
                .on_press(Message::SaveSettings)
                .padding([6, 16]),
        ]
        .spacing(8);

        container(
            column![
                text("API Settings").size(18),
                form_body,
                container(buttons)
                    .width(Length::Fill)
                    .align_x(alignment::Horizontal::Right),
            ]
            .spacing(16),
        )
        .width(Length::Fixed(640.0))
        .padding(20)
        .style(container::rounded_box)
        .into()
    }

    fn theme(&self) -> Theme {
        Theme::TokyoNight
    }
}

/// Dim the base layer and center `content` on top; clicking outside dismisses.
fn modal_backdrop<'a>(content: Element<'a, Message>, on_blur: Message) -> Element<'a, Message> {
    opaque(
        mouse_area(
            center(opaque(content)).style(|_theme| container::Style {
                background: Some(iced::Background::Color(iced::Color {
                    a: 0.6,
                    ..iced::Color::BLACK
                })),
                ..container::Style::default()
            }),
        )
        .on_press(on_blur),
    )
}
