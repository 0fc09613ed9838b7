use super::{FrameworkProfile, KnownConflict};

pub(super) static BUILTIN_PROFILES: &[FrameworkProfile] = &[
    FrameworkProfile {
        name: "django",
        package: "Django",
        indicators: &["django"],
        hidden_imports: &[
            "django.core.management",
            "django.core.management.commands",
            "django.contrib.auth",
            "django.contrib.contenttypes",
            "django.contrib.sessions",
            "django.contrib.messages",
            "django.contrib.staticfiles",
            "django.contrib.admin",
            "django.db.backends.sqlite3",
            "django.template.loaders.filesystem",
            "django.template.loaders.app_directories",
        ],
        collect_all: &["django"],
        data_files: &["templates", "static", "locale", "media", "staticfiles"],
        companions: &["asgiref", "sqlparse"],
        notes: &["Django: bundle the templates and static directories and check database settings"],
    },
    FrameworkProfile {
        name: "flask",
        package: "Flask",
        indicators: &["flask"],
        hidden_imports: &[
            "flask.json",
            "flask.logging",
            "jinja2.ext",
            "werkzeug.serving",
            "werkzeug.middleware.proxy_fix",
        ],
        collect_all: &["flask", "jinja2", "werkzeug"],
        data_files: &["templates", "static"],
        companions: &["jinja2", "werkzeug", "click", "itsdangerous", "markupsafe"],
        notes: &["Flask: include the templates and static directories"],
    },
    FrameworkProfile {
        name: "fastapi",
        package: "fastapi",
        indicators: &["fastapi"],
        hidden_imports: &["uvicorn.main", "uvicorn.config", "uvicorn.logging", "uvicorn.loops.auto"],
        collect_all: &["fastapi", "uvicorn", "starlette", "pydantic"],
        data_files: &[],
        companions: &["uvicorn", "starlette", "pydantic", "anyio"],
        notes: &["FastAPI: the ASGI server (uvicorn) must be bundled explicitly"],
    },
    FrameworkProfile {
        name: "opencv",
        package: "opencv-python",
        indicators: &["cv2"],
        hidden_imports: &["numpy.core._multiarray_umath"],
        collect_all: &["cv2"],
        data_files: &[],
        companions: &["numpy"],
        notes: &["OpenCV: native libraries are collected with --collect-all cv2"],
    },
    FrameworkProfile {
        name: "matplotlib",
        package: "matplotlib",
        indicators: &["matplotlib"],
        hidden_imports: &[
            "matplotlib.backends.backend_agg",
            "matplotlib.backends.backend_tkagg",
            "matplotlib.figure",
            "matplotlib.font_manager",
        ],
        collect_all: &["matplotlib"],
        data_files: &[],
        companions: &["numpy", "PIL", "kiwisolver", "pyparsing", "cycler", "dateutil"],
        notes: &["matplotlib: fonts and mpl-data ship with --collect-all; a backend may need selecting"],
    },
    FrameworkProfile {
        name: "numpy",
        package: "numpy",
        indicators: &["numpy"],
        hidden_imports: &[
            "numpy.core._multiarray_umath",
            "numpy.random._common",
            "numpy.random.bit_generator",
            "numpy.random._bounded_integers",
            "numpy.random._mt19937",
            "numpy.random.mtrand",
        ],
        collect_all: &["numpy"],
        data_files: &[],
        companions: &[],
        notes: &[],
    },
    FrameworkProfile {
        name: "pandas",
        package: "pandas",
        indicators: &["pandas"],
        hidden_imports: &[
            "pandas._libs.tslibs.timedeltas",
            "pandas._libs.tslibs.np_datetime",
            "pandas._libs.tslibs.nattype",
            "pandas._libs.tslibs.timestamps",
            "pandas._libs.properties",
            "pandas.io.formats.style",
        ],
        collect_all: &["pandas"],
        data_files: &[],
        companions: &["numpy", "dateutil", "pytz"],
        notes: &[],
    },
    FrameworkProfile {
        name: "tensorflow",
        package: "tensorflow",
        indicators: &["tensorflow"],
        hidden_imports: &["tensorflow.python", "tensorflow.python.platform", "tensorflow.python.ops"],
        collect_all: &["tensorflow"],
        data_files: &[],
        companions: &["numpy"],
        notes: &["TensorFlow: expect a very large bundle and long build times"],
    },
    FrameworkProfile {
        name: "pytorch",
        package: "torch",
        indicators: &["torch", "torchvision"],
        hidden_imports: &["torch._C", "torch.nn", "torch.optim"],
        collect_all: &["torch", "torchvision"],
        data_files: &[],
        companions: &["numpy"],
        notes: &["PyTorch: CUDA libraries are only bundled if present in the build environment"],
    },
    FrameworkProfile {
        name: "scikit-learn",
        package: "scikit-learn",
        indicators: &["sklearn"],
        hidden_imports: &["sklearn.utils._cython_blas", "sklearn.tree._utils"],
        collect_all: &["sklearn"],
        data_files: &[],
        companions: &["numpy", "scipy", "joblib", "threadpoolctl"],
        notes: &[],
    },
    FrameworkProfile {
        name: "PyQt5",
        package: "PyQt5",
        indicators: &["PyQt5"],
        hidden_imports: &["PyQt5.sip", "PyQt5.QtCore", "PyQt5.QtGui", "PyQt5.QtWidgets"],
        collect_all: &["PyQt5"],
        data_files: &[],
        companions: &[],
        notes: &["PyQt5: Qt platform plugins are collected with --collect-all PyQt5"],
    },
    FrameworkProfile {
        name: "PyQt6",
        package: "PyQt6",
        indicators: &["PyQt6"],
        hidden_imports: &["PyQt6.sip", "PyQt6.QtCore", "PyQt6.QtGui", "PyQt6.QtWidgets"],
        collect_all: &["PyQt6"],
        data_files: &[],
        companions: &[],
        notes: &["PyQt6: do not mix with PyQt5 in one bundle"],
    },
    FrameworkProfile {
        name: "PySide6",
        package: "PySide6",
        indicators: &["PySide6"],
        hidden_imports: &["PySide6.QtCore", "PySide6.QtGui", "PySide6.QtWidgets"],
        collect_all: &["PySide6"],
        data_files: &[],
        companions: &["shiboken6"],
        notes: &[],
    },
    FrameworkProfile {
        name: "tkinter",
        package: "tkinter",
        indicators: &["tkinter"],
        hidden_imports: &["tkinter.ttk", "tkinter.messagebox", "tkinter.filedialog", "_tkinter"],
        collect_all: &[],
        data_files: &[],
        companions: &[],
        notes: &["tkinter: ships with Python but needs the Tcl/Tk runtime files"],
    },
    FrameworkProfile {
        name: "requests",
        package: "requests",
        indicators: &["requests"],
        hidden_imports: &["urllib3", "certifi", "idna", "charset_normalizer"],
        collect_all: &["requests", "certifi"],
        data_files: &[],
        companions: &["urllib3", "certifi", "idna", "charset_normalizer"],
        notes: &[],
    },
    FrameworkProfile {
        name: "selenium",
        package: "selenium",
        indicators: &["selenium"],
        hidden_imports: &[
            "selenium.webdriver.chrome",
            "selenium.webdriver.firefox",
            "selenium.webdriver.edge",
            "selenium.webdriver.common",
        ],
        collect_all: &["selenium"],
        data_files: &[],
        companions: &["urllib3", "certifi"],
        notes: &["selenium: browser drivers are not bundled and must be installed separately"],
    },
    FrameworkProfile {
        name: "pillow",
        package: "Pillow",
        indicators: &["PIL"],
        hidden_imports: &["PIL._imaging", "PIL._imagingft", "PIL._imagingmath"],
        collect_all: &["PIL"],
        data_files: &[],
        companions: &[],
        notes: &[],
    },
    FrameworkProfile {
        name: "scipy",
        package: "scipy",
        indicators: &["scipy"],
        hidden_imports: &["scipy.special.cython_special", "scipy._lib.messagestream"],
        collect_all: &["scipy"],
        data_files: &[],
        companions: &["numpy"],
        notes: &[],
    },
    FrameworkProfile {
        name: "sqlalchemy",
        package: "SQLAlchemy",
        indicators: &["sqlalchemy"],
        hidden_imports: &["sqlalchemy.dialects.sqlite", "sqlalchemy.sql.default_comparator"],
        collect_all: &[],
        data_files: &[],
        companions: &["greenlet"],
        notes: &["SQLAlchemy: database drivers loaded by URL must be listed as hidden imports"],
    },
];

pub(super) static KNOWN_CONFLICTS: &[KnownConflict] = &[
    KnownConflict {
        modules: &["PyQt5", "PyQt6", "PySide2", "PySide6"],
        reason: "only one Qt binding can be bundled; keep a single binding",
    },
    KnownConflict {
        modules: &["PIL", "Image"],
        reason: "the legacy standalone PIL shadows Pillow; import from PIL only",
    },
];
