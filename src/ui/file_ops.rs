//! File operations for exporting and importing saved runs and plot images.
//!
//! Native builds use `rfd` dialogs on the tokio runtime; WASM builds use a
//! temporary anchor element for downloads and a hidden file input for uploads.
//! Results come back to the app over the file-operation channel.

use super::state::{FileOperationResult, FineTuneApp, PendingFileOperation};
use eframe::egui;
use std::sync::mpsc::Sender;

impl FineTuneApp {
    /// Handles pending file operations for both native and WASM platforms.
    ///
    /// Processes completed async operations first, then starts the pending one.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The egui context for requesting repaints
    pub fn handle_pending_operations(&mut self, ctx: &egui::Context) {
        let now = ctx.input(|i| i.time);
        let mut completed = Vec::new();
        if let Some(receiver) = &self.file.file_operation_receiver {
            while let Ok(result) = receiver.try_recv() {
                completed.push(result);
            }
        }
        for result in completed {
            self.apply_file_result(result, now);
        }

        let Some(operation) = self.file.pending_operation.take() else {
            return;
        };
        let sender = self.file.file_operation_sender.clone();

        match operation {
            PendingFileOperation::ExportRuns => match self.runs.export_json() {
                Ok(json) => {
                    Self::save_file(ctx, sender, "finetune_runs.json", "JSON", "json", "application/json", json.into_bytes());
                }
                Err(err) => self.report_failure(format!("Failed to serialize runs: {err}")),
            },
            PendingFileOperation::ImportRuns => {
                Self::open_runs_file(ctx, sender);
            }
            PendingFileOperation::ExportSvg => {
                let svg = self.build_svg();
                Self::save_file(ctx, sender, "finetune_plot.svg", "SVG", "svg", "image/svg+xml", svg.into_bytes());
            }
            PendingFileOperation::ExportPng => {
                #[cfg(not(target_arch = "wasm32"))]
                match self.render_png() {
                    Ok(png) => {
                        Self::save_file(ctx, sender, "finetune_plot.png", "PNG", "png", "image/png", png);
                    }
                    Err(err) => self.report_failure(err.to_string()),
                }

                #[cfg(target_arch = "wasm32")]
                self.report_failure("PNG export is not available in the browser".to_string());
            }
        }
    }

    /// Applies one completed file operation.
    pub(crate) fn apply_file_result(&mut self, result: FileOperationResult, now: f64) {
        match result {
            FileOperationResult::SaveCompleted(path) => {
                log::info!("Saved {path}");
                self.file.status = Some(format!("Saved {path}"));
            }
            FileOperationResult::RunsLoaded(path, content) => {
                match self.runs.import_json(&content, now) {
                    Ok(count) => {
                        log::info!("Imported {count} runs from {path}");
                        self.file.status = Some(format!("Imported {count} runs"));
                    }
                    Err(err) => self.report_failure(format!("Failed to import {path}: {err}")),
                }
            }
            FileOperationResult::OperationFailed(error) => self.report_failure(error),
        }
    }

    fn report_failure(&mut self, message: String) {
        log::error!("{message}");
        self.file.status = Some(message);
    }

    fn send_result(sender: &Option<Sender<FileOperationResult>>, result: FileOperationResult) {
        if let Some(tx) = sender {
            let _ = tx.send(result);
        }
    }

    /// Writes `content` through a save dialog (native) or a browser download (WASM).
    #[allow(clippy::too_many_arguments)]
    fn save_file(
        ctx: &egui::Context,
        sender: Option<Sender<FileOperationResult>>,
        file_name: &'static str,
        filter_name: &'static str,
        extension: &'static str,
        mime_type: &'static str,
        content: Vec<u8>,
    ) {
        let ctx = ctx.clone();

        #[cfg(target_arch = "wasm32")]
        {
            let _ = (filter_name, extension);
            // Use synchronous download for Firefox compatibility
            match Self::trigger_download(file_name, mime_type, &content) {
                Ok(()) => Self::send_result(
                    &sender,
                    FileOperationResult::SaveCompleted(file_name.to_string()),
                ),
                Err(e) => Self::send_result(&sender, FileOperationResult::OperationFailed(e)),
            }
            ctx.request_repaint();
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = mime_type;
            tokio::spawn(async move {
                if let Some(handle) = rfd::AsyncFileDialog::new()
                    .add_filter(filter_name, &[extension])
                    .set_file_name(file_name)
                    .save_file()
                    .await
                {
                    let path = handle.path();
                    let result = match std::fs::write(path, content) {
                        Ok(()) => FileOperationResult::SaveCompleted(path.display().to_string()),
                        Err(e) => {
                            FileOperationResult::OperationFailed(format!("Failed to save file: {e}"))
                        }
                    };
                    Self::send_result(&sender, result);
                }
                ctx.request_repaint();
            });
        }
    }

    /// Lets the user pick a runs JSON file and sends its content back.
    fn open_runs_file(ctx: &egui::Context, sender: Option<Sender<FileOperationResult>>) {
        let ctx = ctx.clone();

        #[cfg(target_arch = "wasm32")]
        {
            wasm_bindgen_futures::spawn_local(async move {
                match Self::show_open_file_picker().await {
                    Some(file) => {
                        let filename = file.name();
                        let result = match Self::read_file(file).await {
                            Ok(content) => FileOperationResult::RunsLoaded(filename, content),
                            Err(e) => FileOperationResult::OperationFailed(e),
                        };
                        Self::send_result(&sender, result);
                    }
                    None => log::debug!("Open dialog cancelled"),
                }
                ctx.request_repaint();
            });
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            tokio::spawn(async move {
                if let Some(handle) = rfd::AsyncFileDialog::new()
                    .add_filter("JSON", &["json"])
                    .pick_file()
                    .await
                {
                    let path = handle.path();
                    let result = match std::fs::read_to_string(path) {
                        Ok(json) => FileOperationResult::RunsLoaded(path.display().to_string(), json),
                        Err(e) => {
                            FileOperationResult::OperationFailed(format!("Failed to read file: {e}"))
                        }
                    };
                    Self::send_result(&sender, result);
                }
                ctx.request_repaint();
            });
        }
    }

    /// Triggers a file download in the browser (WASM only, Firefox-compatible).
    ///
    /// Creates a temporary anchor element with a blob URL and clicks it.
    #[cfg(target_arch = "wasm32")]
    fn trigger_download(filename: &str, mime_type: &str, content: &[u8]) -> Result<(), String> {
        use eframe::wasm_bindgen::JsCast;

        let window = web_sys::window().ok_or("No window found")?;
        let document = window.document().ok_or("No document found")?;

        let bytes = js_sys::Uint8Array::from(content);
        let blob_parts = js_sys::Array::new();
        blob_parts.push(&bytes.buffer());

        let blob_options = web_sys::BlobPropertyBag::new();
        blob_options.set_type(mime_type);

        let blob = web_sys::Blob::new_with_buffer_source_sequence_and_options(&blob_parts, &blob_options)
            .map_err(|_| "Failed to create blob")?;

        let url = web_sys::Url::create_object_url_with_blob(&blob)
            .map_err(|_| "Failed to create object URL")?;

        let anchor = document
            .create_element("a")
            .map_err(|_| "Failed to create anchor element")?
            .dyn_into::<web_sys::HtmlAnchorElement>()
            .map_err(|_| "Failed to cast to anchor element")?;

        anchor.set_href(&url);
        anchor.set_download(filename);
        anchor.style().set_property("display", "none").ok();

        let body = document.body().ok_or("No body found")?;
        body.append_child(&anchor)
            .map_err(|_| "Failed to append anchor")?;
        anchor.click();
        body.remove_child(&anchor)
            .map_err(|_| "Failed to remove anchor")?;

        web_sys::Url::revoke_object_url(&url).map_err(|_| "Failed to revoke object URL")?;

        Ok(())
    }

    /// Opens a file picker in the browser and waits for a selection (WASM only).
    #[cfg(target_arch = "wasm32")]
    async fn show_open_file_picker() -> Option<web_sys::File> {
        use eframe::wasm_bindgen::closure::Closure;
        use eframe::wasm_bindgen::JsCast;

        let window = web_sys::window()?;
        let document = window.document()?;

        let input = document
            .create_element("input")
            .ok()?
            .dyn_into::<web_sys::HtmlInputElement>()
            .ok()?;

        input.set_type("file");
        input.set_accept(".json,application/json");
        input.style().set_property("display", "none").ok()?;

        let (sender, receiver) = futures::channel::oneshot::channel::<Option<web_sys::File>>();
        let sender = std::rc::Rc::new(std::cell::RefCell::new(Some(sender)));

        let onchange = Closure::wrap(Box::new(move |event: web_sys::Event| {
            let file = event
                .target()
                .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
                .and_then(|input| input.files())
                .and_then(|files| files.get(0));
            if let Some(sender) = sender.borrow_mut().take() {
                let _ = sender.send(file);
            }
        }) as Box<dyn FnMut(_)>);

        input.set_onchange(Some(onchange.as_ref().unchecked_ref()));
        onchange.forget();

        document.body()?.append_child(&input).ok()?;
        input.click();

        let file = receiver.await.ok()??;
        document.body()?.remove_child(&input).ok()?;
        Some(file)
    }

    /// Reads a browser `File` as text (WASM only).
    #[cfg(target_arch = "wasm32")]
    async fn read_file(file: web_sys::File) -> Result<String, String> {
        use eframe::wasm_bindgen::closure::Closure;
        use eframe::wasm_bindgen::{JsCast, JsValue};

        let file_reader =
            web_sys::FileReader::new().map_err(|_| "Failed to create FileReader".to_string())?;

        let promise = js_sys::Promise::new(&mut |resolve, reject| {
            let reader = file_reader.clone();
            let onload = Closure::wrap(Box::new(move |_event: web_sys::ProgressEvent| {
                if let Ok(result) = reader.result() {
                    let _ = resolve.call1(&JsValue::NULL, &result);
                }
            }) as Box<dyn FnMut(_)>);
            file_reader.set_onload(Some(onload.as_ref().unchecked_ref()));
            onload.forget();

            let onerror = Closure::wrap(Box::new(move |_event: web_sys::ProgressEvent| {
                let _ = reject.call1(&JsValue::NULL, &JsValue::from_str("Failed to read file"));
            }) as Box<dyn FnMut(_)>);
            file_reader.set_onerror(Some(onerror.as_ref().unchecked_ref()));
            onerror.forget();
        });

        file_reader
            .read_as_text(&file)
            .map_err(|_| "Failed to start reading file".to_string())?;

        let result = wasm_bindgen_futures::JsFuture::from(promise)
            .await
            .map_err(|e| format!("Failed to read file: {e:?}"))?;

        result
            .as_string()
            .ok_or_else(|| "File content is not a string".to_string())
    }

    /// Queues an export of all saved runs.
    pub fn export_runs(&mut self) {
        self.file.pending_operation = Some(PendingFileOperation::ExportRuns);
    }

    /// Queues an import of saved runs from a file.
    pub fn import_runs(&mut self) {
        self.file.pending_operation = Some(PendingFileOperation::ImportRuns);
    }
}
