use crate::error::AppError;
use crate::uploads::{
    validate_image, ImageInput, UploadDir, UploadedImage, MAX_FILE_SIZE, MAX_UPLOADS, PUBLIC_PREFIX,
};
use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

/// A list of strings given either as an array or as newline-delimited text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TextList {
    Lines(Vec<String>),
    Text(String),
}

impl TextList {
    pub fn into_lines(self) -> Vec<String> {
        match self {
            TextList::Lines(lines) => lines,
            TextList::Text(text) => split_lines(&text).collect(),
        }
    }
}

/// Split newline-delimited text into trimmed, non-empty lines.
pub fn split_lines(text: &str) -> impl Iterator<Item = String> + '_ {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
}

/// JSON or urlencoded recipe body. Images are URLs; files need multipart.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RecipeBody {
    pub title: Option<String>,
    pub author: Option<String>,
    #[schema(value_type = Option<Vec<String>>)]
    pub ingredients: Option<TextList>,
    #[schema(value_type = Option<Vec<String>>)]
    pub steps: Option<TextList>,
    /// Image URLs
    #[schema(value_type = Option<Vec<String>>)]
    pub images: Option<TextList>,
}

/// Multipart recipe body.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct RecipeUpload {
    pub title: String,
    pub author: String,
    /// One ingredient per line, or one field per ingredient
    pub ingredients: Option<String>,
    /// One step per line, or one field per step
    pub steps: Option<String>,
    /// Image file, repeated up to 5 times; text parts are taken as image URLs
    #[schema(value_type = String, format = Binary)]
    pub images: Vec<u8>,
}

/// Recipe fields as received, before create/update validation.
#[derive(Debug, Default)]
pub struct RecipeForm {
    pub title: Option<String>,
    pub author: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub steps: Option<Vec<String>>,
    pub images: Vec<ImageInput>,
}

/// Validated recipe fields.
#[derive(Debug)]
pub struct RecipeInput {
    pub title: String,
    pub author: String,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    pub images: Vec<ImageInput>,
}

impl From<RecipeBody> for RecipeForm {
    fn from(body: RecipeBody) -> Self {
        Self {
            title: body.title,
            author: body.author,
            ingredients: body.ingredients.map(TextList::into_lines),
            steps: body.steps.map(TextList::into_lines),
            images: body
                .images
                .map(TextList::into_lines)
                .unwrap_or_default()
                .into_iter()
                .map(|url| url.trim().to_owned())
                .filter(|url| !url.is_empty())
                .map(ImageInput::Url)
                .collect(),
        }
    }
}

impl RecipeForm {
    /// Fields for a new recipe: title, author and at least one image.
    pub fn for_create(self) -> Result<RecipeInput, AppError> {
        if self.images.is_empty() {
            return Err(AppError::Validation(
                "At least one image is required".to_string(),
            ));
        }

        self.validate()
    }

    /// Fields for replacing a recipe: every text field must be present.
    /// Images are optional; without them the stored images are kept.
    pub fn for_update(self) -> Result<RecipeInput, AppError> {
        if self.ingredients.is_none() {
            return Err(AppError::Validation("Ingredients are required".to_string()));
        }
        if self.steps.is_none() {
            return Err(AppError::Validation("Steps are required".to_string()));
        }

        self.validate()
    }

    fn validate(self) -> Result<RecipeInput, AppError> {
        let title = required(self.title)
            .ok_or_else(|| AppError::Validation("Title is required".to_string()))?;
        let author = required(self.author)
            .ok_or_else(|| AppError::Validation("Author is required".to_string()))?;

        for image in &self.images {
            if let ImageInput::Upload(upload) = image {
                validate_image(&upload.data).map_err(|e| {
                    AppError::Validation(format!("{}: {}", upload.file_name, e))
                })?;
            }
        }

        Ok(RecipeInput {
            title,
            author,
            ingredients: self.ingredients.unwrap_or_default(),
            steps: self.steps.unwrap_or_default(),
            images: self.images,
        })
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = RecipeForm::default();
        let mut uploads = 0;

        while let Some(field) = multipart.next_field().await? {
            let name = field
                .name()
                .unwrap_or_default()
                .trim_end_matches("[]")
                .to_owned();

            match name.as_str() {
                "title" => form.title = Some(field.text().await?),
                "author" => form.author = Some(field.text().await?),
                "ingredients" => form
                    .ingredients
                    .get_or_insert_with(Vec::new)
                    .extend(split_lines(&field.text().await?)),
                "steps" => form
                    .steps
                    .get_or_insert_with(Vec::new)
                    .extend(split_lines(&field.text().await?)),
                "images" => {
                    let Some(file_name) = field.file_name().map(str::to_owned) else {
                        let text = field.text().await?;
                        form.images.extend(split_lines(&text).map(ImageInput::Url));
                        continue;
                    };

                    let data = field.bytes().await?;
                    // Browsers send an empty part when no file was picked.
                    if file_name.is_empty() && data.is_empty() {
                        continue;
                    }

                    uploads += 1;
                    if uploads > MAX_UPLOADS {
                        return Err(AppError::Validation(format!(
                            "Too many images. At most {} files may be uploaded",
                            MAX_UPLOADS
                        )));
                    }
                    if data.len() > MAX_FILE_SIZE {
                        return Err(AppError::Validation(format!(
                            "{} is too large. Maximum size is {} bytes",
                            file_name, MAX_FILE_SIZE
                        )));
                    }

                    form.images
                        .push(ImageInput::Upload(UploadedImage { file_name, data }));
                }
                other => tracing::debug!(field = other, "ignoring unknown form field"),
            }
        }

        Ok(form)
    }
}

impl RecipeInput {
    /// Image URLs may not name a file in the upload directory unless it is
    /// one of `owned`, the images the recipe being edited already has.
    /// Otherwise releasing this recipe's images would delete another's files.
    pub fn check_image_urls(
        &self,
        uploads: &UploadDir,
        owned: &[String],
    ) -> Result<(), AppError> {
        for image in &self.images {
            let ImageInput::Url(url) = image else {
                continue;
            };
            if uploads.resolve(url).is_some() && !owned.contains(url) {
                return Err(AppError::Validation(format!(
                    "{url}: images under /{PUBLIC_PREFIX} must be uploaded as files"
                )));
            }
        }
        Ok(())
    }
}

fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl<S> FromRequest<S> for RecipeForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state).await?;
            Self::from_multipart(multipart).await
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(body) = Form::<RecipeBody>::from_request(req, state).await?;
            Ok(body.into())
        } else {
            let Json(body) = Json::<RecipeBody>::from_request(req, state).await?;
            Ok(body.into())
        }
    }
}
