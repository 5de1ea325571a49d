//! Builders for order submissions.

#![allow(dead_code)]

use ordarchive::{OrderInput, UploadedFile};

pub const MINIMAL_PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\ntrailer\n<< /Root 1 0 R >>\n%%EOF\n";

pub fn pdf_file(name: &str) -> UploadedFile {
    UploadedFile::new(name, MINIMAL_PDF.to_vec()).with_content_type("application/pdf")
}

/// Builder for `OrderInput` with a valid scan attached by default.
pub struct OrderBuilder {
    input: OrderInput,
}

impl OrderBuilder {
    pub fn new(order_number: &str) -> Self {
        Self {
            input: OrderInput {
                order_number: Some(order_number.to_string()),
                order_date: Some("2026-02-15".to_string()),
                order_type: Some("Отпуск".to_string()),
                file: Some(pdf_file("scan.pdf")),
                ..Default::default()
            },
        }
    }

    pub fn date(mut self, date: &str) -> Self {
        self.input.order_date = Some(date.to_string());
        self
    }

    pub fn order_type(mut self, order_type: &str) -> Self {
        self.input.order_type = Some(order_type.to_string());
        self
    }

    pub fn sub_type(mut self, sub_type: &str) -> Self {
        self.input.sub_type = Some(sub_type.to_string());
        self
    }

    pub fn employee(mut self, name: &str) -> Self {
        self.input.employee_name = Some(name.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.input.description = Some(description.to_string());
        self
    }

    pub fn basis(mut self, basis: &str) -> Self {
        self.input.basis = Some(basis.to_string());
        self
    }

    pub fn pdf_url(mut self, url: &str) -> Self {
        self.input.pdf_url = Some(url.to_string());
        self
    }

    pub fn file(mut self, file: UploadedFile) -> Self {
        self.input.file = Some(file);
        self
    }

    pub fn without_file(mut self) -> Self {
        self.input.file = None;
        self
    }

    pub fn build(self) -> OrderInput {
        self.input
    }
}
