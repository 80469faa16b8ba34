//! Components shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use domgraft_protocols::{
    Component, ComponentError, Document, InsertPosition, MountContext, MountedComponent, UiEvent,
};

/// Renders `<span class="label">text</span>` into the container.
pub struct Label {
    pub text: String,
    pub unmounts: Arc<AtomicUsize>,
}

impl Label {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            unmounts: Arc::new(AtomicUsize::new(0)),
        }
    }
}

struct LabelInstance {
    unmounts: Arc<AtomicUsize>,
}

impl MountedComponent for LabelInstance {
    fn unmount(&mut self, _document: &dyn Document) -> Result<(), ComponentError> {
        self.unmounts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Component for Label {
    fn name(&self) -> &str {
        "label"
    }

    fn render(&self, ctx: &MountContext<'_>) -> Result<Box<dyn MountedComponent>, ComponentError> {
        let doc = ctx.document();
        let span = doc.create_element("span");
        doc.set_attribute(span, "class", "label")?;
        doc.set_text(span, &self.text)?;
        doc.insert(ctx.container(), span, InsertPosition::Append)?;
        Ok(Box::new(LabelInstance {
            unmounts: self.unmounts.clone(),
        }))
    }
}

/// Fails to render.
pub struct Broken;

impl Component for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn render(&self, _ctx: &MountContext<'_>) -> Result<Box<dyn MountedComponent>, ComponentError> {
        Err(ComponentError::Render("no data".to_string()))
    }
}

/// Panics while rendering, after writing a partial tree.
pub struct Exploding;

impl Component for Exploding {
    fn name(&self) -> &str {
        "exploding"
    }

    fn render(&self, ctx: &MountContext<'_>) -> Result<Box<dyn MountedComponent>, ComponentError> {
        let doc = ctx.document();
        let partial = doc.create_element("p");
        doc.insert(ctx.container(), partial, InsertPosition::Append)?;
        panic!("render bug");
    }
}

/// Counts clicks; fails on an event named "fail".
pub struct Clicker {
    pub clicks: Arc<AtomicUsize>,
}

struct ClickerInstance {
    clicks: Arc<AtomicUsize>,
}

impl MountedComponent for ClickerInstance {
    fn handle_event(&mut self, _document: &dyn Document, event: &UiEvent) -> Result<(), ComponentError> {
        match event.name.as_str() {
            "click" => {
                self.clicks.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            "fail" => Err(ComponentError::Event("cannot handle".to_string())),
            _ => Ok(()),
        }
    }
}

impl Component for Clicker {
    fn name(&self) -> &str {
        "clicker"
    }

    fn render(&self, ctx: &MountContext<'_>) -> Result<Box<dyn MountedComponent>, ComponentError> {
        let doc = ctx.document();
        let button = doc.create_element("button");
        doc.set_text(button, "+1")?;
        doc.insert(ctx.container(), button, InsertPosition::Append)?;
        Ok(Box::new(ClickerInstance {
            clicks: self.clicks.clone(),
        }))
    }
}
